fn main() {
    if let Err(err) = a11ysweep::cli::run() {
        a11ysweep::ui::eprintln_error(&err);
        std::process::exit(a11ysweep::exit::exit_code(&err));
    }
}
