fn main() {
    #[cfg(feature = "cli")]
    tblcodec::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("tblcodec: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
