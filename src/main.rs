#[tokio::main]
async fn main() {
    dockhand::run().await;
}
