use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use sorteo_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::Notifier,
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::{JwtService, TicketCrypto},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置（签名密钥缺失时直接启动失败，无不安全回退）
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 票据签名与JWT服务
    let ticket_crypto =
        TicketCrypto::new(&config.ticket.secret_key).expect("Invalid ticket signing secret");
    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.access_token_expires_in);

    // 外部通知（尽力而为）
    let notifier = Notifier::new(config.notifier.clone());

    // 创建服务
    let ticket_service = TicketService::new(
        pool.clone(),
        ticket_crypto.clone(),
        config.ticket.clone(),
        notifier.clone(),
    );
    let participation_service = ParticipationService::new(
        pool.clone(),
        ticket_crypto.clone(),
        config.ticket.clone(),
        config.raffle.clone(),
    );
    let raffle_service =
        RaffleService::new(pool.clone(), config.raffle.clone(), notifier.clone());
    let draw_service = DrawService::new(pool.clone(), config.raffle.clone(), notifier.clone());

    // 启动后台自动开奖调度
    tasks::spawn_all(
        raffle_service.clone(),
        draw_service.clone(),
        config.raffle.sweep_interval_secs,
    );

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(ticket_service.clone()))
            .app_data(web::Data::new(participation_service.clone()))
            .app_data(web::Data::new(raffle_service.clone()))
            .app_data(web::Data::new(draw_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::ticket_config)
                    .configure(handlers::raffle_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
