use std::{fs, io};
use std::io::Read as _;

use rt::bvh;

#[derive(clap::Parser)]
#[derive(Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    // The precomputed BVH (JSON)
    #[clap(long, value_parser)]
    path: String,

    // Print every leaf's slot and index range
    #[clap(long, action)]
    leaves: bool,
}

fn main() -> anyhow::Result<()> {
    use clap::Parser as _;

    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()?;

    let Args { path, leaves } = Args::parse();

    let mut bytes = Vec::new();
    io::BufReader::new(fs::File::open(path)?).read_to_end(&mut bytes)?;

    let data = bvh::BvhData::from_json(&bytes)?;

    println!("{}", data);

    let mut visited = 0;
    let mut largest = 0;

    for bvh::LeafRange { slot, range } in data.leaves() {
        visited += 1;
        largest = largest.max(range.len() / 3);

        if leaves {
            println!("leaf {:>6}: indices {}..{}", slot, range.start, range.end);
        }
    }

    println!("{} leaves reached by stack traversal, largest holds {} triangles", visited, largest);

    Ok(())
}
