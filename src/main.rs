fn main() {
    if let Err(err) = cld_render::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
