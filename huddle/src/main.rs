use std::{env, path::PathBuf, process::ExitCode, str::FromStr, sync::Arc};

use futures::executor::block_on;
use huddle::{
    alerts::ConsoleAlerts,
    config::{Configuration, DEFAULT_CONFIG_PATH},
    context::Context,
    lifecycle::BackHandler,
    pages::{
        Binder, EditProfile, GroupScreen, Login,
        edit_profile::{ProfileForm, SaveOutcome},
        login::{LoginForm, LoginOutcome},
    },
};
use huddle_interface::{interface::Navigator, types::Route};
use huddle_rest::{Api, Dispatcher, FileStore, Session, SurfTransport};
use strum::EnumString;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const USAGE: &str = "usage: huddle <login USERNAME PASSWORD | group | privacy | profile USERNAME NAME EMAIL | logout>";

#[derive(Debug, Clone, Copy, EnumString)]
#[strum(serialize_all = "lowercase")]
enum Command {
    Login,
    Group,
    Privacy,
    Profile,
    Logout,
}

/// Prints where the user would be taken.
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        info!("Navigate to {route}");
        println!("-> {route}");
    }

    fn go_back(&self) {
        info!("Navigate back");
        println!("<- back");
    }
}

pub fn main() -> ExitCode {
    let config_path = env::var_os("HUDDLE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.into());
    let loaded = match Configuration::read(&config_path) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let defaulted = loaded.is_none();
    let config = loaded.unwrap_or_default();

    // init logger
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
    if defaulted {
        info!("{} not found, using defaults", config_path.display());
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first().and_then(|name| Command::from_str(name).ok()) else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let ctx = match context(&config) {
        Ok(ctx) => ctx,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match block_on(run(ctx, command, &args[1..])) {
        true => ExitCode::SUCCESS,
        false => ExitCode::FAILURE,
    }
}

fn context(config: &Configuration) -> Result<Context, Box<dyn std::error::Error>> {
    let store = FileStore::open(&config.storage.path)?;
    let dispatcher = Dispatcher::new(
        config.api_url()?,
        Arc::new(SurfTransport::new()),
        Session::new(Arc::new(store)),
    );
    Ok(Context::new(
        Api::new(dispatcher),
        Arc::new(ConsoleAlerts),
        Arc::new(ConsoleNavigator),
    ))
}

async fn run(ctx: Context, command: Command, args: &[String]) -> bool {
    let back_handler = BackHandler::new();

    match (command, args) {
        (Command::Login, [username, password]) => {
            let form = LoginForm {
                username: username.clone(),
                password: password.clone(),
            };
            match Login::new(ctx).submit(form).await {
                LoginOutcome::Success(_) => true,
                LoginOutcome::Invalid(errors) => {
                    eprintln!("{errors}");
                    false
                }
                _ => false,
            }
        }
        (Command::Logout, []) => {
            Login::new(ctx).logout().await;
            true
        }
        (Command::Group, []) => {
            let screen = GroupScreen::new(ctx);
            screen.mount(&back_handler);
            screen.on_focus().await;

            let view = screen.view().await;
            screen.unmount();
            let Some(group_id) = &view.group_id else {
                return view.user.is_some();
            };
            println!(
                "group {group_id} ({})",
                if view.is_private { "private" } else { "public" }
            );
            for member in view.visible_members() {
                println!("  {} <{}>", member.username, member.email);
            }
            for member in &view.blocked {
                println!("  {} (blocked)", member.username);
            }
            true
        }
        (Command::Privacy, []) => {
            let screen = GroupScreen::new(ctx);
            screen.mount(&back_handler);
            screen.on_focus().await;

            let before = screen.view().await.is_private;
            screen.toggle_privacy().await;
            let after = screen.view().await.is_private;
            screen.unmount();
            if after != before {
                println!("group is now {}", if after { "private" } else { "public" });
            }
            after != before
        }
        (Command::Profile, [username, name, email]) => {
            let screen = EditProfile::new(ctx);
            screen.mount(&back_handler);
            screen.on_focus().await;
            if !screen.is_data_fetched().await {
                screen.unmount();
                return false;
            }

            let form = ProfileForm {
                username: username.clone(),
                name: name.clone(),
                email: email.clone(),
            };
            let outcome = screen.save(form).await;
            screen.unmount();
            match outcome {
                SaveOutcome::Saved => true,
                SaveOutcome::Invalid(errors) => {
                    eprintln!("{errors}");
                    false
                }
                SaveOutcome::Rejected(_) | SaveOutcome::Failed => false,
            }
        }
        _ => {
            eprintln!("{USAGE}");
            false
        }
    }
}
