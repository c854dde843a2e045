use clap::{Arg, ArgMatches, Command};
use std::process;

use powerflow_rust::devices::{top_devices, CategoryFilter, DeviceCollection, FilterState};
use powerflow_rust::estimator::{estimate_monthly_cost, format_cost, format_kwh};
use powerflow_rust::prelude::*;
use powerflow_rust::validation::FieldErrors;

fn cli() -> Command<'static> {
    Command::new("powerflow")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Household energy dashboard client")
        .arg(
            Arg::new("api_url")
                .long("api-url")
                .value_name("URL")
                .takes_value(true)
                .help("Backend base URL (default: $POWERFLOW_API_URL or http://localhost:5000)"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("login")
                .about("Log in and keep the session")
                .arg(Arg::new("email").long("email").takes_value(true).required(true))
                .arg(Arg::new("password").long("password").takes_value(true).required(true)),
        )
        .subcommand(
            Command::new("register")
                .about("Create an account and log in")
                .arg(Arg::new("name").long("name").takes_value(true).required(true))
                .arg(Arg::new("email").long("email").takes_value(true).required(true))
                .arg(Arg::new("password").long("password").takes_value(true).required(true)),
        )
        .subcommand(Command::new("logout").about("Forget the stored session"))
        .subcommand(Command::new("whoami").about("Show the logged-in user"))
        .subcommand(
            Command::new("devices")
                .about("List devices")
                .arg(Arg::new("search").long("search").takes_value(true))
                .arg(
                    Arg::new("category")
                        .long("category")
                        .takes_value(true)
                        .help("Category name, or \"Todos\""),
                ),
        )
        .subcommand(device_args(
            Command::new("add")
                .about("Register a device")
                .arg(
                    Arg::new("accept_suggestion")
                        .long("accept-suggestion")
                        .help("Apply the AI suggestion to category and power"),
                ),
            true,
        ))
        .subcommand(device_args(
            Command::new("edit")
                .about("Update a device")
                .arg(Arg::new("id").required(true)),
            false,
        ))
        .subcommand(
            Command::new("delete")
                .about("Delete a device")
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("yes").long("yes").help("Confirm the deletion")),
        )
        .subcommand(Command::new("summary").about("Totals and top consumers"))
        .subcommand(
            Command::new("suggest")
                .about("Ask for a category and power guess")
                .arg(Arg::new("name").required(true)),
        )
}

fn device_args(command: Command<'static>, name_required: bool) -> Command<'static> {
    command
        .arg(
            Arg::new("name")
                .long("name")
                .takes_value(true)
                .required(name_required),
        )
        .arg(Arg::new("category").long("category").takes_value(true))
        .arg(Arg::new("power").long("power").value_name("WATTS").takes_value(true))
        .arg(Arg::new("hours").long("hours").value_name("HOURS").takes_value(true))
}

/// Overwrite the form fields given on the command line
fn fill_form(mut form: DeviceForm, matches: &ArgMatches) -> DeviceForm {
    if let Some(name) = matches.value_of("name") {
        form.name = name.to_string();
    }
    if let Some(category) = matches.value_of("category") {
        form.category = category.to_string();
    }
    if let Some(power) = matches.value_of("power") {
        form.power_watts = power.to_string();
    }
    if let Some(hours) = matches.value_of("hours") {
        form.daily_usage_hours = hours.to_string();
    }
    form
}

fn print_field_errors(errors: &FieldErrors) {
    for (field, message) in errors.iter() {
        eprintln!("  {}: {}", field, message);
    }
}

fn print_device(device: &Device) {
    println!(
        "{:>6}  {} {:<24} {:<18} {:>9}  {:>5} h/día  {}",
        device.id,
        Category::icon_for(device.category),
        device.name,
        device.category.map(|c| c.as_str()).unwrap_or("-"),
        device
            .power_watts
            .map(|w| format!("{} W", w))
            .unwrap_or_else(|| "N/A".to_string()),
        device.daily_usage_hours,
        format_kwh(device.monthly_kwh()),
    );
}

async fn run(powerflow: &PowerFlow, matches: &ArgMatches) -> Result<()> {
    let options = powerflow.options();
    let devices = powerflow.devices();
    let mut collection = powerflow.collection();

    match matches.subcommand() {
        Some(("login", args)) => {
            let form = LoginForm::new(
                args.value_of("email").unwrap_or_default(),
                args.value_of("password").unwrap_or_default(),
            );
            let session = powerflow.login(&form).await?;
            println!("Bienvenido, {}", session.user.name);
        }
        Some(("register", args)) => {
            let form = RegisterForm::new(
                args.value_of("name").unwrap_or_default(),
                args.value_of("email").unwrap_or_default(),
                args.value_of("password").unwrap_or_default(),
            );
            if let Some(strength) = form.password_strength() {
                println!("Seguridad de la contraseña: {}", strength.label());
            }
            let session = powerflow.register_and_login(&form).await?;
            println!("Cuenta creada. Bienvenido, {}", session.user.name);
        }
        Some(("logout", _)) => {
            powerflow.logout();
            println!("Sesión cerrada");
        }
        Some(("whoami", _)) => match powerflow.session().user() {
            Some(user) => println!("{} <{}>", user.name, user.email),
            None => return Err(Error::NotLoggedIn),
        },
        Some(("devices", args)) => {
            let category = match args.value_of("category") {
                Some(value) => value.parse::<CategoryFilter>().map_err(Error::config)?,
                None => CategoryFilter::All,
            };
            let filter = FilterState::new(args.value_of("search").unwrap_or_default(), category);

            collection.refresh(&devices).await?;
            let shown = collection.filtered(&filter);
            if shown.is_empty() {
                println!("No hay dispositivos");
            }
            for device in shown {
                print_device(device);
            }
        }
        Some(("add", args)) => {
            let mut form = fill_form(DeviceForm::new(), args);

            let reconciler = powerflow.reconciler(FormMode::Create);
            if let SuggestionState::Proposed { candidate, .. } =
                reconciler.name_changed(&form.name).await
            {
                print_suggestion(&candidate);
                if args.is_present("accept_suggestion") {
                    if let Some(applied) = reconciler.apply(&form) {
                        form = applied;
                    }
                } else {
                    reconciler.discard();
                }
            }

            let created = collection.create(&devices, &form).await?;
            println!("Dispositivo registrado:");
            print_device(&created);
        }
        Some(("edit", args)) => {
            let id = OpaqueId::new(args.value_of("id").unwrap_or_default());
            collection.refresh(&devices).await?;
            let current = collection
                .get(&id)
                .ok_or_else(|| Error::Api {
                    status: 404,
                    message: format!("No existe el dispositivo {}", id),
                })?
                .clone();

            let form = fill_form(DeviceForm::from_device(&current), args);
            collection.update(&devices, &id, &form).await?;
            if let Some(updated) = collection.get(&id) {
                print_device(updated);
            }
        }
        Some(("delete", args)) => {
            let id = OpaqueId::new(args.value_of("id").unwrap_or_default());
            if !args.is_present("yes") {
                println!("Usa --yes para confirmar la eliminación de {}", id);
                return Ok(());
            }
            collection.delete(&devices, &id).await?;
            println!("Dispositivo {} eliminado", id);
        }
        Some(("summary", _)) => {
            collection.refresh(&devices).await?;
            print_summary(&collection, options);
        }
        Some(("suggest", args)) => {
            let name = args.value_of("name").unwrap_or_default();
            let reconciler = powerflow.reconciler(FormMode::Create);
            match reconciler.name_changed(name).await {
                SuggestionState::Proposed { candidate, .. } => print_suggestion(&candidate),
                _ => println!("Sin sugerencias para {:?}", name),
            }
        }
        _ => unreachable!("subcommand_required"),
    }

    Ok(())
}

fn print_suggestion(candidate: &Suggestion) {
    println!("Sugerencia de IA:");
    if let Some(category) = candidate.category {
        println!("  categoría: {} {}", category.icon(), category);
    }
    if let Some(watts) = candidate.power_watts {
        println!("  potencia: {} W", watts);
    }
}

fn print_summary(collection: &DeviceCollection, options: &ClientOptions) {
    let stats = collection.stats(options.summary_usage_hours, options.rate_per_kwh);
    println!("Dispositivos:      {}", stats.count);
    println!("Consumo estimado:  {}", format_kwh(Some(stats.total_monthly_kwh)));
    println!("Costo estimado:    {}", format_cost(stats.total_monthly_cost));

    let top = top_devices(Some(collection.devices()), 3, options.summary_usage_hours);
    if top.is_placeholder() {
        println!("Mayores consumidores (ejemplo):");
    } else {
        println!("Mayores consumidores:");
    }
    for (name, kwh) in top.rows() {
        let cost = kwh
            .map(|kwh| format_cost(estimate_monthly_cost(kwh, options.rate_per_kwh)))
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<24} {:>12}  {}", name, format_kwh(kwh), cost);
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let matches = cli().get_matches();

    let options = match ClientOptions::from_env().and_then(|options| {
        match matches.value_of("api_url") {
            Some(url) => options.with_api_url(url),
            None => Ok(options),
        }
    }) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    let powerflow = match PowerFlow::new(options) {
        Ok(powerflow) => powerflow,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    if let Err(e) = run(&powerflow, &matches).await {
        if let Error::Validation(errors) = &e {
            eprintln!("Revisa los campos:");
            print_field_errors(errors);
        } else {
            eprintln!("{}", e.user_message());
        }
        if let Error::Auth(powerflow_rust::auth::AuthError::Rejected {
            field: Some(field), ..
        }) = &e
        {
            eprintln!("  revisa el campo: {}", field.as_str());
        }
        process::exit(1);
    }
}
