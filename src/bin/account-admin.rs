//! Account Administration CLI
//!
//! Operator commands for managing accounts directly against the database,
//! without going through the HTTP API. The usual first step is
//! `account-admin create-admin` to bootstrap an ADMIN account.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use uuid::Uuid;

use account_service::{
    config::SecurityConfig,
    database::{DatabaseConfig, Pagination, PgAccountRepository},
    models::{Account, RegisterRequest, UserRole},
    service::{AccountService, LifecyclePolicy, LogNotifier},
};

/// Account administration CLI
#[derive(Parser)]
#[command(name = "account-admin", about = "Account administration CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account with the ADMIN role
    CreateAdmin(CreateAdminArgs),
    /// Show one account
    Get(AccountArgs),
    /// List accounts in creation order
    List(ListArgs),
    /// Print the number of accounts
    Count,
    /// Clear a lockout and reset the failed-login counter
    Unlock(AccountArgs),
    /// Lock an account
    Lock(AccountArgs),
    /// Change an account's role
    SetRole(SetRoleArgs),
    /// Set a new password; also clears any lockout
    ResetPassword(ResetPasswordArgs),
    /// Permanently delete an account
    Delete(DeleteArgs),
}

#[derive(Args)]
struct CreateAdminArgs {
    #[arg(short, long)]
    email: String,

    #[arg(short, long)]
    password: String,

    /// Generated when omitted
    #[arg(short, long)]
    nickname: Option<String>,
}

#[derive(Args)]
struct AccountArgs {
    /// Account ID or email address
    account: String,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long, default_value_t = 0)]
    skip: i64,

    #[arg(long, default_value_t = Pagination::DEFAULT_LIMIT)]
    limit: i64,
}

#[derive(Args)]
struct SetRoleArgs {
    /// Account ID or email address
    account: String,

    /// ANONYMOUS, AUTHENTICATED, MANAGER or ADMIN
    role: UserRole,
}

#[derive(Args)]
struct ResetPasswordArgs {
    /// Account ID or email address
    account: String,

    #[arg(short, long)]
    password: String,
}

#[derive(Args)]
struct DeleteArgs {
    /// Account ID or email address
    account: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let db_config = DatabaseConfig::from_env().context("DATABASE_URL must be set")?;
    let database_pool = db_config
        .create_pool()
        .await
        .context("Failed to connect to the database")?;

    // Run migrations to ensure database is up to date
    sqlx::migrate!("./migrations").run(&database_pool).await?;

    let base_url = account_service::config::env::get_string(
        "SERVER_BASE_URL",
        "http://localhost:8000/",
    );
    let service = AccountService::new(
        Arc::new(PgAccountRepository::new(database_pool.clone())),
        Arc::new(LogNotifier),
        LifecyclePolicy::from(&SecurityConfig::from_env()),
        base_url,
    );

    let result = match cli.command {
        Commands::CreateAdmin(args) => create_admin(&service, args).await,
        Commands::Get(args) => show_account(&service, args).await,
        Commands::List(args) => list_accounts(&service, args).await,
        Commands::Count => {
            println!("{}", service.count().await?);
            Ok(())
        }
        Commands::Unlock(args) => unlock_account(&service, args).await,
        Commands::Lock(args) => lock_account(&service, args).await,
        Commands::SetRole(args) => set_role(&service, args).await,
        Commands::ResetPassword(args) => reset_password(&service, args).await,
        Commands::Delete(args) => delete_account(&service, args).await,
    };

    database_pool.close().await;
    result
}

/// Look an account up by ID, falling back to email
async fn resolve(service: &AccountService, account: &str) -> anyhow::Result<Account> {
    let found = match Uuid::parse_str(account) {
        Ok(id) => service.get_by_id(id).await?,
        Err(_) => service.get_by_email(account).await?,
    };
    found.ok_or_else(|| anyhow!("No account matches '{}'", account))
}

async fn create_admin(service: &AccountService, args: CreateAdminArgs) -> anyhow::Result<()> {
    let mut request = RegisterRequest::new(args.email, args.password);
    request.nickname = args.nickname;
    request.role = Some(UserRole::Admin);

    let registration = service.register(request).await?;
    let account = registration.account;

    println!("Admin account created");
    println!("   ID: {}", account.id);
    println!("   Email: {}", account.email);
    println!("   Nickname: {}", account.nickname);
    println!(
        "   Verification link: {}",
        if registration.notification.is_sent() {
            "logged by the service"
        } else {
            "not delivered"
        }
    );

    Ok(())
}

async fn show_account(service: &AccountService, args: AccountArgs) -> anyhow::Result<()> {
    let account = resolve(service, &args.account).await?;

    println!("ID: {}", account.id);
    println!("Email: {}", account.email);
    println!("Nickname: {}", account.nickname);
    println!("Role: {}", account.role);
    println!("Email verified: {}", yes_no(account.email_verified));
    println!("Locked: {}", yes_no(account.is_locked));
    println!("Failed logins: {}", account.failed_login_attempts);
    println!("Professional: {}", yes_no(account.is_professional));
    if let Some(last_login) = account.last_login_at {
        println!("Last login: {}", last_login);
    }
    println!("Created: {}", account.created_at);
    println!("Updated: {}", account.updated_at);

    Ok(())
}

async fn list_accounts(service: &AccountService, args: ListArgs) -> anyhow::Result<()> {
    let page = service
        .list(Pagination::new(args.skip, args.limit))
        .await?;

    if page.items.is_empty() {
        println!("No accounts found.");
        return Ok(());
    }

    println!(
        "{:<38} {:<32} {:<14} {:<7} {:<16}",
        "ID", "Email", "Role", "Locked", "Created"
    );
    println!("{}", "-".repeat(110));

    for account in &page.items {
        println!(
            "{:<38} {:<32} {:<14} {:<7} {:<16}",
            account.id,
            truncate_string(&account.email, 31),
            account.role,
            yes_no(account.is_locked),
            account.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!();
    println!(
        "Showing {}-{} of {}",
        page.skip + 1,
        page.skip + page.items.len() as i64,
        page.total
    );

    Ok(())
}

async fn unlock_account(service: &AccountService, args: AccountArgs) -> anyhow::Result<()> {
    let account = resolve(service, &args.account).await?;
    if !service.unlock(account.id).await? {
        bail!("Account {} disappeared before it could be unlocked", account.id);
    }
    println!("Account {} unlocked", account.email);
    Ok(())
}

async fn lock_account(service: &AccountService, args: AccountArgs) -> anyhow::Result<()> {
    let account = resolve(service, &args.account).await?;
    if !service.lock(account.id).await? {
        bail!("Account {} disappeared before it could be locked", account.id);
    }
    println!("Account {} locked", account.email);
    Ok(())
}

async fn set_role(service: &AccountService, args: SetRoleArgs) -> anyhow::Result<()> {
    let account = resolve(service, &args.account).await?;
    let updated = service.update_role(account.id, args.role).await?;
    println!(
        "Account {} role changed from {} to {}",
        updated.email, account.role, updated.role
    );
    Ok(())
}

async fn reset_password(service: &AccountService, args: ResetPasswordArgs) -> anyhow::Result<()> {
    let account = resolve(service, &args.account).await?;
    if !service.reset_password(account.id, &args.password).await? {
        bail!("Account {} disappeared before its password was reset", account.id);
    }
    println!("Password reset for {}", account.email);
    Ok(())
}

async fn delete_account(service: &AccountService, args: DeleteArgs) -> anyhow::Result<()> {
    let account = resolve(service, &args.account).await?;

    if !args.yes {
        println!(
            "Delete account {} ({})? This cannot be undone. (y/N): ",
            account.email, account.id
        );
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Operation cancelled.");
            return Ok(());
        }
    }

    if !service.delete(account.id).await? {
        bail!("Account {} was already deleted", account.id);
    }
    println!("Account {} deleted", account.email);
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
