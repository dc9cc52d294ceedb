use log::LevelFilter;

/// Initialize logging for the application.
///
/// Should be called once at the start of `main()`. Lines are formatted as
/// `{timestamp}  {LEVEL} {message}` and written to stderr. Calling it a second
/// time is harmless: the error from `fern` is ignored.
pub fn init_logging(level: LevelFilter) {
    let result = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}  {} {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                record.level(),
                message
            ));
        })
        .level(level)
        .chain(std::io::stderr())
        .apply();

    if result.is_err() {
        log::debug!("Logger already initialized");
    }
}

