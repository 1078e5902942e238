use anyhow::Context;

fn main() {
    if let Err(err) = logdata_migrate::run().context("logdata-migrate failed") {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
