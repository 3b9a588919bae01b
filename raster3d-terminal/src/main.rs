/// raster3d - render a mesh to PNG and/or the terminal
///
/// Examples:
///   raster3d model.stl --mode shaded --output model.png
///   raster3d --surface --mode depth
///   raster3d --mode wire --projection iso
use raster3d_terminal::{run, Options, USAGE};
use std::process::ExitCode;

fn setup_logger(level: log::LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}:{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                message
            ))
        })
        .level(level)
        // stdout carries the picture
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    let options = match Options::parse(args) {
        Ok(options) => options,
        Err(why) => {
            eprintln!("{}\n{}", why, USAGE);
            return ExitCode::from(2);
        }
    };

    if let Err(why) = setup_logger(options.log_level) {
        eprintln!("Failed to initialise logging: {}", why);
    }

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(why) => {
            log::error!("{}", why);
            eprintln!("Error: {}", why);
            ExitCode::FAILURE
        }
    }
}
