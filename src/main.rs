// Terminal front-end for the simulated dispatch demo.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    resq_lib::run().await
}
