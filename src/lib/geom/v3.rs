// Positions stay plain arrays so they can be handed to bytemuck
// and serde without any wrapping or unwrapping
pub type V3<T> = [T; 3];

pub trait V3Ops {
    type Ty: Copy + num_traits::Float;

    fn add(self, b: Self) -> Self;
    fn sub(self, b: Self) -> Self;
    fn scale(self, s: Self::Ty) -> Self;
    fn min(self, b: Self) -> Self;
    fn max(self, b: Self) -> Self;
    fn cross(self, b: Self) -> Self;
    fn dot(self, b: Self) -> Self::Ty;
    fn mag(self) -> Self::Ty;
    fn normalize(self) -> Self;
    fn angle(self, fst: Self, snd: Self) -> Self::Ty;
}

impl<T: Copy + num_traits::Float> V3Ops for V3<T> {
    type Ty = T;

    fn add(self, b: Self) -> Self {
        [self[0] + b[0], self[1] + b[1], self[2] + b[2]]
    }

    fn sub(self, b: Self) -> Self {
        [self[0] - b[0], self[1] - b[1], self[2] - b[2]]
    }

    fn scale(self, s: T) -> Self {
        [self[0] * s, self[1] * s, self[2] * s]
    }

    // NOTE: Float::min/max return the non-NaN operand,
    // which keeps a single bad vertex from poisoning a whole box
    fn min(self, b: Self) -> Self {
        [self[0].min(b[0]), self[1].min(b[1]), self[2].min(b[2])]
    }

    fn max(self, b: Self) -> Self {
        [self[0].max(b[0]), self[1].max(b[1]), self[2].max(b[2])]
    }

    fn cross(self, b: Self) -> Self {
        [
            self[1] * b[2] - self[2] * b[1],
            self[2] * b[0] - self[0] * b[2],
            self[0] * b[1] - self[1] * b[0],
        ]
    }

    fn dot(self, b: Self) -> T {
        self[0] * b[0] + self[1] * b[1] + self[2] * b[2]
    }

    fn mag(self) -> T {
        self.dot(self).sqrt()
    }

    // Zero-length vectors are returned untouched instead of becoming NaN
    fn normalize(self) -> Self {
        let mag = self.mag();

        if mag > T::zero() { self.scale(mag.recip()) } else { self }
    }

    // Assumes self is the target point, fst and snd are the other 2
    fn angle(self, fst: Self, snd: Self) -> T {
        let ab = fst.sub(self);
        let ac = snd.sub(self);

        let denom = ab.mag() * ac.mag();
        if denom > T::zero() {
            (ab.dot(ac) / denom).max(-T::one()).min(T::one()).acos()
        } else {
            T::zero()
        }
    }
}
