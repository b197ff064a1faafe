//!
//! civic CLI binary
//! ----------------
//! Command-line front end for a local civic portal store. Every invocation
//! opens the snapshot under `--root`, restores the persisted session and runs
//! one command as the signed-in account.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use civic_connect::cli::{print_record, print_records};
use civic_connect::config::PortalConfig;
use civic_connect::error::AppError;
use civic_connect::identity::authorizer::{self, Action};
use civic_connect::identity::{assess_password, Account, Role};
use civic_connect::portal::{IssueStatus, NewIssue, Portal};
use civic_connect::storage::{KvStore, SnapshotFormat};

const ACCOUNT_COLS: &[&str] = &["id", "name", "email", "role", "createdAt"];
const ISSUE_COLS: &[&str] = &["id", "title", "location", "status", "citizenName", "responses", "createdAt"];
const UPDATE_COLS: &[&str] = &["id", "title", "politicianName", "createdAt"];
const FUND_COLS: &[&str] = &["id", "title", "authorName", "photo", "createdAt"];

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--root <dir>] [--config <file>] <command> [args...]\n\nAccount commands:\n  register <name> <email> <password> [citizen|politician]\n  login <email> <password>\n  logout\n  whoami\n  passwd <current> <new> <confirm>\n  profile <name> <email>\n  strength <password>\n\nAdministration (admin only):\n  users\n  role <id> <citizen|politician|moderator|admin>\n  delete-user <id>\n\nPortal commands:\n  issue report <title> <description> <location> [photo]\n  issue list [open|in-progress|resolved]\n  issue respond <id> <message>\n  issue status <id> <open|in-progress|resolved>\n  issue delete <id>\n  update post <title> <content>\n  update list\n  update delete <id>\n  fund create <title> <description> [photo]\n  fund list\n  fund delete <id>\n  stats\n\nFlags:\n  --root <dir>       Data directory holding the snapshot (env: CIVIC_DATA_DIR, default civic_data)\n  --config <file>    JSON config file (env: CIVIC_CONFIG)\n  -h, --help         Show this help\n\nSet CIVIC_OUTPUT=json for JSON output and RUST_LOG for diagnostics.\n\nExit codes: 0 ok, 2 invalid input, 3 not found or login failed, 4 not signed in or forbidden, 1 other."
    );
}

fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = if args.is_empty() { "civic_cli".to_string() } else { args.remove(0) };

    let mut root: Option<String> = None;
    let mut config: Option<String> = None;
    let mut rest: Vec<String> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--root" => {
                if i + 1 >= args.len() { eprintln!("--root requires a value"); print_usage(&program); std::process::exit(2); }
                root = Some(args[i + 1].clone());
                i += 2; continue;
            }
            "--config" => {
                if i + 1 >= args.len() { eprintln!("--config requires a value"); print_usage(&program); std::process::exit(2); }
                config = Some(args[i + 1].clone());
                i += 2; continue;
            }
            "-h" | "--help" => {
                print_usage(&program);
                return;
            }
            _ => {
                // first positional starts the command; everything after belongs to it
                rest.extend(args[i..].iter().cloned());
                break;
            }
        }
    }
    if rest.is_empty() {
        print_usage(&program);
        std::process::exit(2);
    }

    let code = match run(root, config, &rest) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            match e.downcast_ref::<AppError>() {
                Some(app) => app.exit_code(),
                None => 1,
            }
        }
    };
    std::process::exit(code);
}

fn data_root(root: Option<String>) -> PathBuf {
    root.or_else(|| env::var("CIVIC_DATA_DIR").ok())
        .unwrap_or_else(|| "civic_data".to_string())
        .into()
}

fn open_portal(root: Option<String>, config: Option<String>) -> Result<Portal> {
    let cfg = PortalConfig::load(config.as_deref().map(std::path::Path::new))?;
    let file = match cfg.snapshot_format {
        SnapshotFormat::Json => "portal.json",
        SnapshotFormat::Bincode => "portal.bin",
    };
    let path = data_root(root).join(file);
    let kv = KvStore::open(&path, cfg.snapshot_format)
        .with_context(|| format!("opening store at {}", path.display()))?;
    Ok(Portal::open(Arc::new(kv), cfg)?)
}

fn signed_in(portal: &Portal) -> Result<Account, AppError> {
    portal.auth().current().ok_or_else(|| AppError::auth("not_authenticated".to_string(), "sign in first with `login`".to_string()))
}

/// Positional argument `idx` of the command, or a usage error naming it.
fn arg<'a>(args: &'a [String], idx: usize, name: &'static str) -> Result<&'a str, AppError> {
    args.get(idx).map(String::as_str).ok_or_else(|| AppError::user("missing_argument".to_string(), format!("missing <{}>", name)))
}

fn run(root: Option<String>, config: Option<String>, args: &[String]) -> Result<i32> {
    let cmd = args[0].as_str();

    // needs no store
    if cmd == "strength" {
        let s = assess_password(arg(args, 1, "password")?);
        print_record(&s);
        return Ok(0);
    }

    let portal = open_portal(root, config)?;
    let auth = portal.auth();
    match cmd {
        "register" => {
            let role = match args.get(4) {
                Some(r) => r.parse::<Role>()?,
                None => Role::Citizen,
            };
            let acct = auth.register(arg(args, 1, "name")?, arg(args, 2, "email")?, arg(args, 3, "password")?, role)?;
            println!("registered and signed in as {} ({})", acct.email, acct.role);
        }
        "login" => match auth.login(arg(args, 1, "email")?, arg(args, 2, "password")?)? {
            Some(acct) => println!("signed in as {} ({})", acct.email, acct.role),
            None => {
                eprintln!("login failed: invalid email or password");
                return Ok(3);
            }
        },
        "logout" => {
            auth.logout()?;
            println!("signed out");
        }
        "whoami" => match auth.current() {
            Some(acct) => print_record(&acct),
            None => println!("not signed in"),
        },
        "passwd" => {
            auth.change_password(arg(args, 1, "current")?, arg(args, 2, "new")?, arg(args, 3, "confirm")?)?;
            println!("password changed");
        }
        "profile" => {
            let acct = auth.update_profile(arg(args, 1, "name")?, arg(args, 2, "email")?)?;
            print_record(&acct);
        }
        "users" => {
            let me = signed_in(&portal)?;
            authorizer::require(&me, Action::ManageUsers)?;
            print_records(&auth.list_accounts()?, ACCOUNT_COLS);
        }
        "role" => {
            let me = signed_in(&portal)?;
            let role: Role = arg(args, 2, "role")?.parse()?;
            let acct = auth.set_role(&me, arg(args, 1, "id")?, role)?;
            println!("{} is now {}", acct.email, acct.role);
        }
        "delete-user" => {
            let me = signed_in(&portal)?;
            let report = portal.delete_account(&me, arg(args, 1, "id")?)?;
            println!(
                "deleted {} (issues removed: {}, updates removed: {})",
                report.account.email, report.issues_removed, report.updates_removed
            );
        }
        "issue" => return run_issue(&portal, &args[1..]),
        "update" => return run_update(&portal, &args[1..]),
        "fund" => return run_fund(&portal, &args[1..]),
        "stats" => {
            let me = auth.current();
            print_record(&portal.stats(me.as_ref())?);
        }
        other => {
            return Err(AppError::user("unknown_command".to_string(), format!("unknown command '{}'", other)).into());
        }
    }
    Ok(0)
}

fn run_issue(portal: &Portal, args: &[String]) -> Result<i32> {
    let board = portal.issues();
    match arg(args, 0, "subcommand")? {
        "list" => {
            let status = match args.get(1) {
                Some(s) => Some(s.parse::<IssueStatus>()?),
                None => None,
            };
            print_records(&board.list(status)?, ISSUE_COLS);
        }
        "report" => {
            let me = signed_in(portal)?;
            let new = NewIssue {
                title: arg(args, 1, "title")?.to_string(),
                description: arg(args, 2, "description")?.to_string(),
                location: arg(args, 3, "location")?.to_string(),
                photo: args.get(4).cloned(),
            };
            let issue = board.report(&me, new)?;
            println!("reported issue {}", issue.id);
        }
        "respond" => {
            let me = signed_in(portal)?;
            let r = board.respond(&me, arg(args, 1, "id")?, arg(args, 2, "message")?)?;
            println!("response {} added", r.id);
        }
        "status" => {
            let me = signed_in(portal)?;
            let status: IssueStatus = arg(args, 2, "status")?.parse()?;
            let issue = board.set_status(&me, arg(args, 1, "id")?, status)?;
            println!("issue {} is now {}", issue.id, issue.status);
        }
        "delete" => {
            let me = signed_in(portal)?;
            let issue = board.delete(&me, arg(args, 1, "id")?)?;
            println!("deleted issue {}", issue.id);
        }
        other => return Err(AppError::user("unknown_command".to_string(), format!("unknown issue subcommand '{}'", other)).into()),
    }
    Ok(0)
}

fn run_update(portal: &Portal, args: &[String]) -> Result<i32> {
    let feed = portal.updates();
    match arg(args, 0, "subcommand")? {
        "list" => print_records(&feed.list()?, UPDATE_COLS),
        "post" => {
            let me = signed_in(portal)?;
            let u = feed.post(&me, arg(args, 1, "title")?, arg(args, 2, "content")?)?;
            println!("posted update {}", u.id);
        }
        "delete" => {
            let me = signed_in(portal)?;
            let u = feed.delete(&me, arg(args, 1, "id")?)?;
            println!("deleted update {}", u.id);
        }
        other => return Err(AppError::user("unknown_command".to_string(), format!("unknown update subcommand '{}'", other)).into()),
    }
    Ok(0)
}

fn run_fund(portal: &Portal, args: &[String]) -> Result<i32> {
    let board = portal.crowdfunds();
    match arg(args, 0, "subcommand")? {
        "list" => print_records(&board.list()?, FUND_COLS),
        "create" => {
            let me = signed_in(portal)?;
            let post = board.create(&me, arg(args, 1, "title")?, arg(args, 2, "description")?, args.get(3).map(String::as_str))?;
            println!("created crowdfunding post {}", post.id);
        }
        "delete" => {
            let me = signed_in(portal)?;
            let post = board.delete(&me, arg(args, 1, "id")?)?;
            println!("deleted crowdfunding post {}", post.id);
        }
        other => return Err(AppError::user("unknown_command".to_string(), format!("unknown fund subcommand '{}'", other)).into()),
    }
    Ok(0)
}
