fn main() {
    if let Err(e) = medic_assist_lib::run() {
        eprintln!("medic-assist: {e}");
        std::process::exit(1);
    }
}
