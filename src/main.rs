use personal_site::config::get_configuration;
use personal_site::notifications::worker::run_worker_until_stopped;
use personal_site::startup::Application;
use personal_site::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber(String::from("personal_site"), String::from("info"));

    init_subscriber(subscriber);

    let config = get_configuration().expect("Missing configuration file.");
    let application = Application::build(config.clone()).await?;

    tracing::info!("Server listening on port {}", application.get_port());

    let application_task = tokio::spawn(application.run_until_stop());
    let worker_task = tokio::spawn(run_worker_until_stopped(config));

    // Both tasks are expected to run forever; if either exits the process
    // goes down with it rather than limping along half-alive.
    tokio::select! {
        outcome = application_task => report_exit("HTTP server", outcome),
        outcome = worker_task => report_exit("Notification worker", outcome),
    };

    Ok(())
}

fn report_exit(
    task_name: &str,
    outcome: Result<std::io::Result<()>, tokio::task::JoinError>,
) {
    match outcome {
        Ok(Ok(())) => tracing::info!("{} has exited.", task_name),
        Ok(Err(error)) => tracing::error!("{} failed: {:?}", task_name, error),
        Err(error) => tracing::error!("{} task failed to complete: {:?}", task_name, error),
    }
}
