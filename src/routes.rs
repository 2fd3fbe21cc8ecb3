use crate::{
    api::{session, vocabulary},
    auth::middleware::auth_middleware,
    backend::BackendProvider,
    config::Config,
    utils::session_store::SessionStore,
    vocabulary::Vocabulary,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::time::Duration;

pub type Limiter = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Everything the handlers pull out of app data, built once and shared by all workers.
#[derive(Clone)]
pub struct AppState {
    pub config: web::Data<Config>,
    pub sessions: web::Data<SessionStore>,
    pub backend: web::Data<dyn BackendProvider>,
    pub vocabulary: web::Data<dyn Vocabulary>,
    pub limiter: Arc<Limiter>,
}

impl AppState {
    pub fn new(
        config: Config,
        backend: Arc<dyn BackendProvider>,
        vocabulary: Arc<dyn Vocabulary>,
    ) -> Result<Self> {
        let sessions = SessionStore::new(
            config.session_capacity,
            Duration::from_secs(config.session_ttl_secs),
        );
        let limiter = build_limiter(config.rate_session_per_min)?;

        Ok(Self {
            config: web::Data::new(config),
            sessions: web::Data::new(sessions),
            backend: web::Data::from(backend),
            vocabulary: web::Data::from(vocabulary),
            limiter: Arc::new(limiter),
        })
    }
}

fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {requests_per_min} per minute"))
}

pub fn configure(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.app_data(state.config.clone())
        .app_data(state.sessions.clone())
        .app_data(state.backend.clone())
        .app_data(state.vocabulary.clone());

    // Protected routes
    cfg.service(
        web::scope(&state.config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Governor::new(state.limiter.as_ref())) // rate limiting
            .route("/me", web::get().to(vocabulary::me))
            .route("/vocabulary", web::get().to(vocabulary::get_vocabulary))
            .service(
                web::scope("/sessions")
                    // /sessions
                    .service(web::resource("").route(web::post().to(session::create_session)))
                    // /sessions/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(session::get_session))
                            .route(web::delete().to(session::close_session)),
                    )
                    .service(
                        web::resource("/{id}/selection")
                            .route(web::put().to(session::update_selection)),
                    )
                    .service(web::resource("/{id}/advance").route(web::post().to(session::advance)))
                    .service(web::resource("/{id}/retreat").route(web::post().to(session::retreat)))
                    .service(
                        web::resource("/{id}/roster").route(web::post().to(session::load_roster)),
                    )
                    // /sessions/{id}/students
                    .service(
                        web::resource("/{id}/students").route(web::put().to(session::set_all)),
                    )
                    .service(
                        web::resource("/{id}/students/{student_id}")
                            .route(web::put().to(session::set_status)),
                    )
                    .service(web::resource("/{id}/submit").route(web::post().to(session::submit))),
            ),
    );
}
