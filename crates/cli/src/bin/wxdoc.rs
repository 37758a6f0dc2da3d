//! wxdoc binary entrypoint.

fn main() {
    if let Err(err) = wxdoc_cli::app::run() {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
