use actix_web::{
    dev::Server,
    web::{self, Data},
    App, HttpServer,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{net::TcpListener, sync::Arc};
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::{
    configuration::{DatabaseSettings, Settings},
    repositories::{
        contribution_postgres_repository::ContributionPostgresRepository,
        emne_postgres_repository::EmnePostgresRepository,
        master_document_postgres_repository::MasterDocumentPostgresRepository,
        openai_completion_repository::OpenAiCompletionRepository,
    },
    routes::{generate_document, health_check, list_documents},
    use_cases::synthesize_document::SynthesizeDocumentUseCase,
};

/// Holds the newly built server, and some useful properties
pub struct Application {
    server: Server,
    port: u16,
}

#[derive(thiserror::Error, Debug)]
pub enum ApplicationBuildError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl Application {
    /// # Parameters
    /// - nb_workers: number of actix-web workers
    ///   if `None`, the number of available physical CPUs is used as the worker count.
    #[tracing::instrument(name = "Building application", skip(settings))]
    pub async fn build(
        settings: Settings,
        nb_workers: Option<usize>,
    ) -> Result<Self, ApplicationBuildError> {
        let connection_pool = get_connection_pool(&settings.database);

        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr().unwrap().port();

        let emne_repository = Arc::new(EmnePostgresRepository::new(connection_pool.clone()));
        let contribution_repository =
            Arc::new(ContributionPostgresRepository::new(connection_pool.clone()));
        let master_document_repository =
            Arc::new(MasterDocumentPostgresRepository::new(connection_pool));
        let completion_port = Arc::new(OpenAiCompletionRepository::new(&settings.generation));

        let synthesize_document_use_case = SynthesizeDocumentUseCase::new(
            emne_repository,
            contribution_repository,
            master_document_repository.clone(),
            completion_port,
        );

        let server = run(
            listener,
            nb_workers,
            synthesize_document_use_case,
            master_document_repository,
        )?;

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// This function only returns when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        info!("Running server ...");
        self.server.await
    }
}

/// listener: the consumer binds their own port
///
/// TracingLogger middleware: helps collecting telemetry data.
/// It generates a unique identifier for each incoming request: `request_id`.
///
/// # Parameters
/// - nb_workers: number of actix-web workers
///   if `None`, the number of available physical CPUs is used as the worker count.
pub fn run(
    listener: TcpListener,
    nb_workers: Option<usize>,
    synthesize_document_use_case: SynthesizeDocumentUseCase,
    master_document_repository: Arc<MasterDocumentPostgresRepository>,
) -> Result<Server, std::io::Error> {
    // Wraps the use case and repositories in `actix_web::Data` (`Arc`) to be able
    // to register them and access them from handlers.
    // They are shared among all threads.
    let synthesize_document_use_case = Data::new(synthesize_document_use_case);
    let master_document_repository = Data::from(master_document_repository);

    // `move` to capture variables from the surrounding environment
    let server = HttpServer::new(move || {
        info!("Starting actix-web worker");

        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/api/ai/generate", web::post().to(generate_document))
            .route(
                "/api/emner/{emne_id}/documents",
                web::get().to(list_documents),
            )
            .app_data(synthesize_document_use_case.clone())
            .app_data(master_document_repository.clone())
    })
    .listen(listener)?;

    // If no workers were set, use the actix-web settings (number of workers = number of physical CPUs)
    if let Some(nb_workers) = nb_workers {
        return Ok(server.workers(nb_workers).run());
    }

    // No await
    Ok(server.run())
}

pub fn get_connection_pool(settings: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(settings.with_db())
}
