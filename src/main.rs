#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = homecall::run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
    Ok(())
}
