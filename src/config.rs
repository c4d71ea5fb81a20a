#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub smtp_host: String,
    pub smtp_username: String,
    pub smtp_password: String,
    pub smtp_from: String,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        let port = std::env::var("PORT").unwrap_or_else(|_| "8000".to_string());

        let smtp_host = std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string());
        let smtp_username = std::env::var("SMTP_USERNAME").unwrap_or_default();
        let smtp_password = std::env::var("SMTP_PASSWORD").unwrap_or_default();
        let smtp_from =
            std::env::var("SMTP_FROM").unwrap_or_else(|_| "no-reply@counselhub.app".to_string());

        Config {
            database_url,
            jwt_secret,
            port: port.parse::<u16>().expect("PORT must be a number"),
            smtp_host,
            smtp_username,
            smtp_password,
            smtp_from,
        }
    }
}
