use log::{debug, error, info, warn};
use sentry_target::{Capture, SentryTarget, TargetLogger, TargetOptions};

fn main() {
    let mut log_builder = pretty_env_logger::formatted_builder();
    log_builder.parse_filters("info");

    let options = TargetOptions::from_env()
        .expect("invalid target configuration")
        .client_options(sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        })
        .extra_callback(|mut capture| {
            if let Capture::Event(event) = &mut capture {
                event.tags.insert("demo".into(), "log".into());
            }
            Ok(capture)
        });
    let target = SentryTarget::new(options);
    let logger = TargetLogger::new(target)
        .filter(log::LevelFilter::Warn)
        .dest_log(log_builder.build());

    let target = logger.target().clone();
    log::set_boxed_logger(Box::new(logger)).expect("a logger is already installed");
    log::set_max_level(log::LevelFilter::Info);

    debug!("System is booting");
    info!("System is booting");
    warn!(disk = "/dev/sda1", free_mb = 120; "Disk is almost full");
    error!("Everything is on fire!");

    target.flush(None);
}
