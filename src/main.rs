use std::sync::Arc;

use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader};

use tutorly::auth::{Registration, Role};
use tutorly::config::ClientConfig;
use tutorly::guard::{HistoryRouter, Router};
use tutorly::onboarding::model::BIO_MAX_CHARS;
use tutorly::onboarding::{
    Advance, FieldUpdate, LanguageSkill, OnboardingState, OnboardingStep, OnboardingWorkflow,
    Proficiency, StepStatus,
};
use tutorly::portal::Portal;

const HELP: &str = "\
Commands:
  status                                   show session, path and onboarding progress
  go <path>                                navigate (guarded)
  back                                     go back in history
  login <email> <password>                 sign in
  register <first> <last> <email> <password> <student|instructor>
  logout                                   sign out
  onboard                                  open instructor onboarding
  set country|headline|bio <text>          edit the onboarding form
  set rate|trial <amount>
  set language <name> <level>
  set subject <slug>
  next | prev                              move through onboarding steps
  quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ClientConfig::from_env();

    let router = Arc::new(HistoryRouter::new(config.routes.home.clone()));
    let portal = Portal::from_config(&config, router.clone()).await?;

    eprintln!("Tutorly v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Backend: {}",
        config.api_base_url.as_deref().unwrap_or("built-in mock")
    );
    eprintln!("   Credentials: {}", config.credentials_path.display());
    eprintln!("   Type `help` for commands.\n");

    portal.sessions().initialize().await;
    print_status(&portal, None);

    let mut workflow: Option<Arc<OnboardingWorkflow>> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");

    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            eprint!("> ");
            continue;
        };

        match command {
            "quit" | "exit" => break,
            "help" => println!("{HELP}"),
            "status" => print_status(&portal, workflow.as_deref()),
            "go" => match args.first() {
                Some(path) => {
                    let decision = portal.visit(path);
                    println!("{decision:?} -> {}", router.current_path());
                }
                None => println!("usage: go <path>"),
            },
            "back" => match router.back() {
                Some(path) => {
                    let decision = portal.evaluate_current();
                    println!("{decision:?} -> {path}");
                }
                None => println!("Nothing to go back to"),
            },
            "login" => match args {
                [email, password] => {
                    let password = SecretString::from(password.to_string());
                    match portal.login(email, &password).await {
                        Ok(destination) => println!("Signed in. Now at {destination}"),
                        Err(e) => println!("Login failed: {e}"),
                    }
                }
                _ => println!("usage: login <email> <password>"),
            },
            "register" => match args {
                [first, last, email, password, role] => match role.parse::<Role>() {
                    Ok(role) => {
                        let registration = Registration::new(*first, *last, *email, *password, role);
                        match portal.register(&registration).await {
                            Ok(destination) => println!("Account created. Now at {destination}"),
                            Err(e) => println!("Registration failed: {e}"),
                        }
                    }
                    Err(e) => println!("{e}"),
                },
                _ => println!("usage: register <first> <last> <email> <password> <student|instructor>"),
            },
            "logout" => {
                workflow = None;
                if let Some(notification) = portal.logout() {
                    // Let the remote notification finish before the next prompt.
                    let _ = notification.await;
                }
                println!("Signed out");
            }
            "onboard" => match portal.open_onboarding() {
                Ok(opened) => {
                    print_status(&portal, Some(&*opened));
                    workflow = Some(opened);
                }
                Err(decision) => println!("Not available: {decision:?} -> {}", router.current_path()),
            },
            "set" => match (&workflow, parse_update(args)) {
                (Some(active), Ok(update)) => {
                    active.update(update);
                    println!("Saved to form");
                }
                (None, _) => println!("Open the onboarding first (`onboard`)"),
                (_, Err(usage)) => println!("{usage}"),
            },
            "next" => {
                let Some(active) = workflow.as_ref() else {
                    println!("Open the onboarding first (`onboard`)");
                    eprint!("> ");
                    continue;
                };
                match portal.advance_onboarding(active).await {
                    Ok(Advance::Moved { .. }) => print_status(&portal, Some(&**active)),
                    Ok(Advance::Completed { destination }) => {
                        println!("Onboarding complete. Now at {destination}");
                        workflow = None;
                    }
                    Ok(Advance::Discarded) => println!("Save superseded"),
                    Err(e) => println!("Could not continue: {e}"),
                }
            }
            "prev" => match &workflow {
                Some(active) => {
                    active.retreat();
                    print_status(&portal, workflow.as_deref());
                }
                None => println!("Open the onboarding first (`onboard`)"),
            },
            other => println!("Unknown command `{other}`. Type `help`."),
        }
        eprint!("> ");
    }

    Ok(())
}

fn parse_update(args: &[&str]) -> Result<FieldUpdate, String> {
    let Some((&field, rest)) = args.split_first() else {
        return Err("usage: set <field> <value>".into());
    };
    let text = rest.join(" ");
    let amount = || {
        text.parse::<u32>()
            .map_err(|_| format!("{field} must be a whole number"))
    };

    match field {
        "country" => Ok(FieldUpdate::Country(text)),
        "headline" => Ok(FieldUpdate::Headline(text)),
        "bio" => Ok(FieldUpdate::Bio(text)),
        "rate" => Ok(FieldUpdate::RegularRate(amount()?)),
        "trial" => Ok(FieldUpdate::TrialRate(amount()?)),
        "subject" => Ok(FieldUpdate::AddSubject(text)),
        "language" => match rest {
            [name, level] => {
                let proficiency: Proficiency = level.parse()?;
                Ok(FieldUpdate::AddLanguage(LanguageSkill::new(*name, proficiency)))
            }
            _ => Err("usage: set language <name> <level>".into()),
        },
        other => Err(format!("unknown field `{other}`")),
    }
}

fn print_status(portal: &Portal, workflow: Option<&OnboardingWorkflow>) {
    let session = portal.session();
    match session.user() {
        Some(user) => println!("Signed in as {} <{}> ({})", user.full_name(), user.email, user.role),
        None => println!("Not signed in"),
    }
    println!("At {}", portal.router().current_path());

    if let Some(workflow) = workflow {
        print_onboarding(&workflow.snapshot());
    }
}

fn print_onboarding(state: &OnboardingState) {
    let bar: Vec<String> = OnboardingStep::ALL
        .iter()
        .map(|step| {
            let marker = match state.status_of(*step) {
                StepStatus::Completed => "x",
                StepStatus::Active => ">",
                StepStatus::Pending => " ",
            };
            format!("[{marker}] {}", step.label())
        })
        .collect();
    println!("{}  ({}%)", bar.join("  "), state.progress_percent());

    let step = state.current_step();
    let content = step.content();
    match content.notice() {
        Some(notice) => println!("{notice}"),
        None => {
            let form = state.form();
            println!(
                "{}: country={:?} headline={:?} bio={}/{} rate={} trial={} subjects={:?}",
                step.label(),
                form.country,
                form.headline,
                form.bio_len(),
                BIO_MAX_CHARS,
                form.pricing.regular,
                form.pricing.trial,
                form.subjects,
            );
        }
    }
    if state.can_retreat() {
        println!("`prev` to go back, `next` to {}", state.primary_action().to_lowercase());
    } else {
        println!("`next` to {}", state.primary_action().to_lowercase());
    }
}
