fn main() {
    let code = jumpdiff::cli::run();
    if code != 0 {
        std::process::exit(code);
    }
}
