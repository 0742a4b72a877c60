use crate::{api, auth::Sessions, setting::Setting, Error, Result, Service};
use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest},
    middleware, web, App as WebApp, HttpServer,
};
use sea_orm::{ConnectOptions, Database};
use std::path::Path;
use tracing::{error, info};

pub struct AppState {
    pub service: Service,
    pub sessions: Sessions,
    pub setting: Setting,
}

impl AppState {
    pub async fn create<P: AsRef<Path>>(
        setting_path: Option<P>,
        setting_env_prefix: Option<String>,
    ) -> Result<Self> {
        let env_notice = setting_env_prefix
            .as_ref()
            .map(|s| {
                format!(
                    ", config will be overrided by ENV seting with prefix `{}_`",
                    s
                )
            })
            .unwrap_or_default();

        let setting = if let Some(path) = setting_path {
            info!("Load config {:?}{}", path.as_ref(), env_notice);
            Setting::read(path.as_ref(), setting_env_prefix)?
        } else if let Some(prefix) = setting_env_prefix {
            info!("Load default config{}", env_notice);
            Setting::from_env(prefix)?
        } else {
            info!("Load default config");
            Setting::default()
        };

        info!(
            "network: {:?}, session: {:?}, roles: {:?}",
            setting.network, setting.session, setting.auth.roles
        );

        Self::from_setting(setting).await
    }

    /// Missing required settings leave the app running in a degraded state.
    pub async fn from_setting(setting: Setting) -> Result<Self> {
        for name in setting.missing() {
            error!("Missing required setting `{}`, please check your config or .env file", name);
        }

        let service = match &setting.db_url {
            Some(url) => {
                let mut options = ConnectOptions::from(url);
                options.sqlx_logging_level(tracing::log::LevelFilter::Trace);
                let conn = Database::connect(options).await?;
                Service::new(conn)
            }
            None => Service::unavailable(),
        };
        let sessions = Sessions::from_setting(&setting.session);

        Ok(Self {
            service,
            sessions,
            setting,
        })
    }
}

pub fn create_web_app(
    data: web::Data<AppState>,
) -> WebApp<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    WebApp::new()
        .app_data(data)
        .app_data(
            web::JsonConfig::default()
                .error_handler(|err, _req| Error::InvalidParam(err.to_string()).into()),
        )
        .app_data(
            web::QueryConfig::default()
                .error_handler(|err, _req| Error::InvalidParam(err.to_string()).into()),
        )
        .app_data(
            web::PathConfig::default()
                .error_handler(|err, _req| Error::InvalidParam(err.to_string()).into()),
        )
        .wrap(middleware::Logger::default()) // enable logger
        .wrap(
            Cors::default()
                .allow_any_header()
                .allow_any_origin()
                .allow_any_method()
                .max_age(86_400),
        )
        .service(api::scope())
}

/// start app
pub async fn start(state: AppState) -> Result<()> {
    let state = web::Data::new(state);

    let c_data = state.clone();
    let server = HttpServer::new(move || create_web_app(c_data.clone()));
    let num = if state.setting.thread.http == 0 {
        num_cpus::get()
    } else {
        state.setting.thread.http
    };
    let host = state.setting.network.host.clone();
    let port = state.setting.network.port;
    info!("Start http server {}:{}", host, port);
    server.workers(num).bind((host, port))?.run().await?;
    Ok(())
}
