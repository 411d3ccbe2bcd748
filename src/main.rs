fn main() {
    if let Err(err) = som_overlay::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
