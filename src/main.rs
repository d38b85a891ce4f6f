use std::io;

#[tokio::main]
async fn main() -> io::Result<()> {
    linkprobe::app::run().await
}
