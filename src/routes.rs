use crate::{
    api::{attendance, center, child, dashboard, notification, parent, report, teacher},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Result, anyhow};
use std::sync::Arc;

type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// One token is restored every interval; a zero rate counts as one per minute.
fn refill_interval_ms(requests_per_min: u32) -> u64 {
    (60_000 / requests_per_min.max(1) as u64).max(1)
}

fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(refill_interval_ms(requests_per_min))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {} per minute", requests_per_min))?;
    Ok(Governor::new(&cfg))
}

/// Per-route limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    login: Arc<Limiter>,
    register: Arc<Limiter>,
    refresh: Arc<Limiter>,
    protected: Arc<Limiter>,
}

impl Limiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: Arc::new(build_limiter(config.rate_login_per_min)?),
            register: Arc::new(build_limiter(config.rate_register_per_min)?),
            refresh: Arc::new(build_limiter(config.rate_refresh_per_min)?),
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(limiters.register.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(web::resource("/me").route(web::get().to(handlers::me)))
            .service(web::resource("/dashboard").route(web::get().to(dashboard::dashboard)))
            .service(
                web::scope("/centers")
                    .service(
                        web::resource("")
                            .route(web::post().to(center::create_center))
                            .route(web::get().to(center::list_centers)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(center::get_center))
                            .route(web::put().to(center::update_center))
                            .route(web::delete().to(center::delete_center)),
                    ),
            )
            .service(
                web::scope("/parents")
                    .service(
                        web::resource("")
                            .route(web::post().to(parent::create_parent))
                            .route(web::get().to(parent::list_parents)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(parent::get_parent))
                            .route(web::put().to(parent::update_parent))
                            .route(web::delete().to(parent::delete_parent)),
                    ),
            )
            .service(
                web::scope("/children")
                    .service(
                        web::resource("")
                            .route(web::post().to(child::create_child))
                            .route(web::get().to(child::list_children)),
                    )
                    // registered before /{id} so "search" is not taken as an id
                    .service(web::resource("/search").route(web::get().to(child::search_children)))
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(child::get_child))
                            .route(web::put().to(child::update_child))
                            .route(web::delete().to(child::delete_child)),
                    )
                    .service(
                        web::resource("/{id}/profile").route(web::get().to(child::child_profile)),
                    ),
            )
            .service(
                web::scope("/teachers")
                    .service(
                        web::resource("")
                            .route(web::post().to(teacher::create_teacher))
                            .route(web::get().to(teacher::list_teachers)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(teacher::get_teacher))
                            .route(web::put().to(teacher::update_teacher))
                            .route(web::delete().to(teacher::delete_teacher)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .service(web::resource("").route(web::get().to(attendance::list_attendance)))
                    .service(web::resource("/sign-in").route(web::post().to(attendance::sign_in)))
                    .service(web::resource("/sign-out").route(web::post().to(attendance::sign_out)))
                    .service(
                        web::resource("/status/{child_id}")
                            .route(web::get().to(attendance::child_status)),
                    )
                    .service(
                        web::resource("/records").route(web::get().to(attendance::attendance_records)),
                    ),
            )
            .service(
                web::scope("/notifications")
                    .service(
                        web::resource("").route(web::get().to(notification::list_notifications)),
                    )
                    .service(
                        web::resource("/{id}/read").route(web::put().to(notification::mark_read)),
                    ),
            )
            .service(
                web::scope("/reports")
                    .service(web::resource("/summary").route(web::get().to(report::summary)))
                    .service(
                        web::resource("/children/{id}").route(web::get().to(report::child_report)),
                    )
                    .service(
                        web::resource("/attendance.csv").route(web::get().to(report::export_csv)),
                    )
                    .service(
                        web::resource("/attendance.pdf").route(web::get().to(report::export_pdf)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token + rotated refresh_token
