fn main() {
    if let Err(e) = gallery_ngin::run() {
        log::error!("gallery stopped: {:#}", e);
        eprintln!("gallery stopped: {:#}", e);
        std::process::exit(1);
    }
}
