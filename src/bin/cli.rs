//! Nexupload command line interface.

use std::{fs::File, process};

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_t, App, AppSettings::*, Arg,
};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, trace, LevelFilter};
use simplelog::*;

use nexupload::{self as nu, ReaderSource, UploadSession};

fn main() {
    println!("[NU] nexupload v{}", crate_version!());

    ctrlc::set_handler(move || {
        println!("🛑 received Ctrl+C!");
        process::exit(130);
    })
    .expect("Failed to install my Ctrl-C handler!");

    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            Nexupload pushes a .tft firmware image, as produced by the \
            Nextion Editor, to a Nextion display over its serial port:\n\
               \t* puts the display in runtime mode 2 and keeps it awake \n\
               \t* requests the upload with the image size and the upload \
                   baud rate, then switches to that baud rate \n\
               \t* sends the image in 4096 byte packets, waiting for the \
                   display to acknowledge each of them \n\
               \t* waits for the display to finish flashing and resets it\n\
            \n\
            When no port is given, the available ones are offered for \
            selection.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .arg(
            Arg::with_name("DEVICE_TTY")
                .help("the tty device the display is connected to")
                .short("-t")
                .long("--tty")
                .takes_value(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("BAUD_RATE")
                .help("baud rate the display currently uses")
                .short("-b")
                .long("--baud-rate")
                .takes_value(true)
                .default_value("9600")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("UPLOAD_BAUD_RATE")
                .help("baud rate for the firmware transfer")
                .long_help(
                    "baud rate for the firmware transfer; the display \
                     supports 2400 up to 921600, higher is faster but less \
                     tolerant of long or noisy cables.",
                )
                .short("-u")
                .long("--upload-baud-rate")
                .takes_value(true)
                .default_value("115200")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("FIRMWARE")
                .help("path to the .tft firmware image")
                .required(true)
                .index(1),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .get_matches();

    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("Failed to initialize the logger!");

    trace!("{:#?}", matches);

    // Arguments with default values ===========================================

    let baud_rate = numeric_arg(&matches, "BAUD_RATE", "baud-rate");
    let upload_baud_rate = numeric_arg(&matches, "UPLOAD_BAUD_RATE", "upload-baud-rate");

    let mut builder = nu::SettingsBuilder::default()
        .baud_rate(baud_rate)
        .upload_baud_rate(upload_baud_rate);

    // Arguments with NO default values ========================================

    if let Some(path) = matches.value_of("DEVICE_TTY") {
        builder = builder.path(path);
    }
    if let Some(image) = matches.value_of("FIRMWARE") {
        builder = builder.firmware_image(image);
    }
    let mut settings = builder.finalize();

    if settings.path.is_none() {
        settings.path = nu::select_port();
        if settings.path.is_none() {
            println!("{}", style("[NU] 🔌 No serial port selected").red());
            process::exit(1);
        }
    }

    // Run the upload ==========================================================

    let exit_code = match upload(&settings) {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            println!("{}", style(format!("[NU] 💥 Upload failed: {}", e)).red());
            1
        }
    };
    debug!("exit code: {}", exit_code);
    process::exit(exit_code);
}

fn upload(settings: &nu::Settings) -> Result<(), nu::Error> {
    let image_path = settings.firmware_image.as_deref().unwrap_or_default();
    let file = File::open(image_path)?;
    let size = file.metadata()?.len();

    let link = nu::open_and_setup_port(settings)?;
    let mut session = UploadSession::new(link, settings.upload_baud_rate);

    println!(
        "[NU] 📟 Preparing the display for {} ({} bytes)",
        style(image_path).cyan(),
        size
    );
    session.prepare_upload(Some(size))?;

    let pb = ProgressBar::new(size);
    pb.set_style(ProgressStyle::default_bar()
        .template("[NU] ⏩ Uploading [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .progress_chars("=>-"));
    let ticker = pb.clone();
    session.set_progress_callback(move || ticker.tick());

    session.upload_from(&mut ReaderSource::new(pb.wrap_read(file)))?;
    pb.finish_with_message("uploaded");

    println!("[NU] ⏳ Waiting for the display to restart...");
    session.end()?;
    println!("{}", style(format!("[NU] 👍 {}", session.status_message())).green());
    Ok(())
}

fn numeric_arg(matches: &clap::ArgMatches, name: &str, flag: &str) -> u32 {
    // Safe to unwrap the value, the argument has a default.
    value_t!(matches.value_of(name), u32).unwrap_or_else(|_| {
        println!(
            "{}: `{}` needs to be a numeric value",
            style("error").red(),
            style(flag).cyan()
        );
        println!(
            "   {} `{}` is not a valid value",
            style("-->").cyan(),
            style(matches.value_of(name).unwrap_or_default()).on_red()
        );
        process::exit(-1);
    })
}
