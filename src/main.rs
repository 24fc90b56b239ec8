fn main() {
    #[cfg(feature = "cli")]
    deltacol::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("deltacol: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
