use std::{fs, io, path};
use std::io::Write as _;

use rt::{bvh, scene};

fn main() -> anyhow::Result<()> {
    let parsed = clap::Command::new(env!("CARGO_BIN_NAME"))
        .arg(
            clap::Arg::new("out")
                .long("out")
                .number_of_values(1)
                .required(true))
        .arg(
            clap::Arg::new("model")
                .long("model")
                .min_values(1)
                .required(true)
                .action(clap::ArgAction::Append))
        .arg(
            clap::Arg::new("config")
                .long("config")
                .number_of_values(1))
        .arg(
            clap::Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(clap::ArgAction::SetTrue))
        .get_matches();

    let verbose = parsed
        .get_one::<bool>("verbose")
        .copied()
        .unwrap_or(false);

    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()?;

    let config = match parsed.get_one::<String>("config") {
        Some(path) => {
            let reader = io::BufReader::new(fs::File::open(path)?);

            serde_json::from_reader::<_, bvh::BuildConfig>(reader)?
        },
        None => bvh::BuildConfig::default(),
    };

    let mut batch = scene::SceneBatch::new();

    for model in parsed.get_many::<String>("model").unwrap_or_default() {
        let obj = wavefront::Obj::from_file(path::PathBuf::from(model))?;

        let tag = batch.add_obj(&obj)?;

        log::info!("loaded {} as mesh {}", model, tag);
    }

    let (data, stats) = rt::compile(&batch, &config);

    log::info!("{} ({} levels, {}ms)", data, stats.depth, stats.elapsed.as_millis());

    let Some(out) = parsed.get_one::<String>("out").map(path::PathBuf::from) else {
        anyhow::bail!("Flag --out is required");
    };

    fs::File::create(out)?
        .write_all(serde_json::to_string(&data)?.as_bytes())?;

    Ok(())
}
