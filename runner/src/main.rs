use {
    log::error,
    std::process::exit,
    tvr_runner::{cli, run, EXIT_FAILED, EXIT_PASSED, EXIT_SETUP_ERROR},
};

fn main() {
    let matches = cli::app().get_matches();
    let args = match cli::parse_args(&matches) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            exit(EXIT_SETUP_ERROR);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .thread_name("tvrRunner")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start the async runtime: {e}");
            exit(EXIT_SETUP_ERROR);
        }
    };

    let code = match runtime.block_on(run(args)) {
        Ok(true) => EXIT_PASSED,
        Ok(false) => EXIT_FAILED,
        Err(e) => {
            // The run may have failed before installing the logger.
            tvr_logger::setup();
            error!("{e}");
            EXIT_SETUP_ERROR
        }
    };
    exit(code);
}
