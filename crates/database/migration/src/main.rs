//! Runs the Postman database migrations from the command line.

use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    tracing::info!(target: "postman::migration", "Running database migrations.");
    cli::run_cli(postman_migration::Migrator).await;
    tracing::info!(target: "postman::migration", "Database migrations complete.")
}
