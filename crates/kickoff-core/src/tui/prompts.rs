//! Charm-style CLI prompts using cliclack

use crate::auth::{AuthStore, Credentials};
use crate::error::Error;
use crate::registry::{Catalog, PromptKind, PromptSpec, Template, TemplateConfig};
use crate::templates::renderer::value_to_string;
use crate::templates::{materialize, render_tree, Transport};
use crate::vars::{self, GeneratorRegistry, VarMap};
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;
use std::path::Path;
use std::path::PathBuf;

const TOKEN_SETTINGS_URL: &str = "https://github.com/settings/tokens";

/// CLI arguments for the create command
#[derive(Debug, Clone, Default)]
pub struct CreateArgs {
    /// Project name (also the destination directory)
    pub project_name: Option<String>,

    /// Template key to use, skipping selection
    pub template: Option<String>,

    /// JSON file with pre-answered variables
    pub config: Option<PathBuf>,

    /// Auto-confirm all prompts (non-interactive mode)
    pub yes: bool,
}

/// CLI arguments for the auth command
#[derive(Debug, Clone, Default)]
pub struct AuthArgs {
    pub setup: bool,
    pub view: bool,
    pub clear: bool,
}

/// Run the create flow with interactive prompts
pub async fn create(args: CreateArgs) -> Result<()> {
    cliclack::intro("Kickoff")?;

    let transport = Transport::new(AuthStore::new());
    let catalog = Catalog::new(transport.clone());

    // Step 1: Basic project info
    let mut variables = prompt_basic_info(&args)?;

    // Pre-answered variables from --config
    if let Some(path) = &args.config {
        let overrides = load_config_file(path)?;
        cliclack::log::info(format!(
            "Loaded {} values from {}",
            overrides.len(),
            path.display()
        ))?;
        variables = vars::layered(&variables, overrides);
    }

    // Step 2: Select template
    let template = select_template(&catalog, args.template.as_deref()).await?;

    // Step 3: Template-specific configuration
    let config = catalog.template_config(&template.key).await;
    variables = configure_template(&config, variables, args.yes)?;

    // Step 4: Fill remaining variables from the generator registry
    let registry = GeneratorRegistry::builtin();
    let variables = registry.generate(&template.key, &variables);
    vars::validate_required(&template.key, &template.body, &variables)?;

    // Step 5: Materialize and render
    let project_name = variables
        .get("projectName")
        .and_then(Value::as_str)
        .map(str::to_string)
        .context("project name was not set")?;
    let destination = resolve_destination(&project_name, args.yes)?;

    let spinner = cliclack::spinner();
    spinner.start(format!("Downloading template '{}'...", template.key));
    match materialize(&transport, &template.key, &destination).await {
        Ok(()) => spinner.stop("Template downloaded"),
        Err(e) => {
            spinner.stop("Download failed");
            cliclack::log::warning(format!(
                "Partially created files may remain in {}",
                destination.display()
            ))?;
            return Err(e.into());
        }
    }

    let spinner = cliclack::spinner();
    spinner.start("Processing template files...");
    if let Err(e) = render_tree(&destination, &variables) {
        spinner.stop("Processing failed");
        return Err(e.into());
    }
    spinner.stop(format!("Project created in {}", destination.display()));

    print_next_steps(&project_name, &template)?;

    Ok(())
}

fn prompt_basic_info(args: &CreateArgs) -> Result<VarMap> {
    let project_name = match &args.project_name {
        Some(name) => {
            if !valid_project_name(name) {
                anyhow::bail!(
                    "Invalid project name '{}': use lowercase letters, digits and hyphens, starting with a letter",
                    name
                );
            }
            cliclack::log::info(format!("Project: {}", name))?;
            name.clone()
        }
        None if args.yes => {
            anyhow::bail!("A project name is required with --yes");
        }
        None => cliclack::input("Project name")
            .placeholder("my-app")
            .validate(|input: &String| {
                if valid_project_name(input) {
                    Ok(())
                } else {
                    Err("Use lowercase letters, digits and hyphens, starting with a letter")
                }
            })
            .interact()?,
    };

    let (description, author_name, author_email) = if args.yes {
        (String::new(), String::new(), String::new())
    } else {
        let description: String = cliclack::input("Project description")
            .required(false)
            .interact()?;
        let author_name: String = cliclack::input("Author name").interact()?;
        let author_email: String = cliclack::input("Author email")
            .validate(|input: &String| {
                if valid_email(input) {
                    Ok(())
                } else {
                    Err("Enter a valid email address")
                }
            })
            .interact()?;
        (description, author_name, author_email)
    };

    let mut map = VarMap::new();
    map.insert("projectName".into(), Value::String(project_name));
    map.insert("projectDescription".into(), Value::String(description));
    map.insert("authorName".into(), Value::String(author_name));
    map.insert("authorEmail".into(), Value::String(author_email));
    Ok(map)
}

fn load_config_file(path: &Path) -> Result<VarMap> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Config file {} is not valid JSON", path.display()))?;

    match value {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("Config file {} must contain a JSON object", path.display()),
    }
}

async fn select_template(catalog: &Catalog, specified: Option<&str>) -> Result<Template> {
    let spinner = cliclack::spinner();
    spinner.start("Loading templates...");

    // If a template was specified via argument, use it directly
    if let Some(key) = specified {
        match catalog.template(key).await {
            Ok(template) => {
                spinner.stop(format!(
                    "Template: {} - {}",
                    template.body.name, template.body.description
                ));
                return Ok(template);
            }
            Err(Error::TemplateNotFound { .. }) => {
                spinner.stop("Template not found");
                let available: Vec<String> = catalog
                    .list_templates()
                    .await?
                    .into_iter()
                    .map(|t| t.key)
                    .collect();
                anyhow::bail!(
                    "Template '{}' not found. Available templates: {}",
                    key,
                    available.join(", ")
                );
            }
            Err(e) => {
                spinner.stop("Failed to load templates");
                print_registry_hints()?;
                return Err(e.into());
            }
        }
    }

    let templates = match catalog.list_templates().await {
        Ok(templates) => templates,
        Err(e) => {
            spinner.stop("Failed to load templates");
            print_registry_hints()?;
            return Err(e.into());
        }
    };
    spinner.stop(format!("{} templates available", templates.len()));

    if templates.is_empty() {
        anyhow::bail!("The template registry is empty.");
    }

    // Narrow by category first when there is more than one
    let mut categories: Vec<&str> = Vec::new();
    for template in &templates {
        let category = category_of(template);
        if !categories.contains(&category) {
            categories.push(category);
        }
    }

    let candidates: Vec<&Template> = if categories.len() > 1 {
        let mut select = cliclack::select("What kind of project do you want to build?");
        for (idx, category) in categories.iter().enumerate() {
            select = select.item(idx, category, "");
        }
        let idx: usize = select.interact()?;
        let chosen = categories[idx];
        templates
            .iter()
            .filter(|t| category_of(t) == chosen)
            .collect()
    } else {
        templates.iter().collect()
    };

    // If only one template remains, use it automatically
    if candidates.len() == 1 {
        let template = candidates[0];
        cliclack::log::info(format!(
            "Using template: {} - {}",
            template.body.name, template.body.description
        ))?;
        return Ok(template.clone());
    }

    let mut select = cliclack::select("Select a template");
    for (idx, template) in candidates.iter().enumerate() {
        select = select.item(idx, &template.body.name, &template.body.description);
    }
    let selected_idx: usize = select.interact()?;

    Ok(candidates[selected_idx].clone())
}

fn category_of(template: &Template) -> &str {
    if template.body.category.is_empty() {
        "other"
    } else {
        &template.body.category
    }
}

/// Walk the template's prompt specs, skipping names that already have an
/// answer, then layer in template-provided values and conditional follow-ups.
fn configure_template(config: &TemplateConfig, base: VarMap, yes: bool) -> Result<VarMap> {
    let pending: Vec<&PromptSpec> = config
        .prompts
        .iter()
        .filter(|spec| !base.contains_key(&spec.name))
        .collect();

    let mut answers = VarMap::new();
    if !pending.is_empty() && !config.name.is_empty() {
        cliclack::log::step(format!("Configuring {}", config.name))?;
    }
    for spec in &pending {
        answers.insert(spec.name.clone(), prompt_for(spec, yes)?);
    }

    let mut merged = vars::layered(&base, answers.clone());
    merged = vars::layered(&merged, config.generated_vars.clone().into_iter().collect());

    for (trigger, follow_ups) in &config.conditional_prompts {
        if !is_truthy(answers.get(trigger).or_else(|| merged.get(trigger))) {
            continue;
        }
        let mut conditional = VarMap::new();
        for spec in follow_ups {
            if merged.contains_key(&spec.name) {
                continue;
            }
            conditional.insert(spec.name.clone(), prompt_for(spec, yes)?);
        }
        merged = vars::layered(&merged, conditional);
    }

    Ok(merged)
}

fn prompt_for(spec: &PromptSpec, yes: bool) -> Result<Value> {
    if yes {
        return Ok(spec
            .default
            .clone()
            .unwrap_or_else(|| Value::String(String::new())));
    }

    match spec.kind {
        PromptKind::Input => {
            let mut input = cliclack::input(&spec.message).required(false);
            if let Some(default) = spec.default.as_ref().and_then(Value::as_str) {
                if !default.is_empty() {
                    input = input.default_input(default);
                }
            }
            let answer: String = input.interact()?;
            Ok(Value::String(answer))
        }
        PromptKind::Password => {
            let answer: String = cliclack::password(&spec.message).mask('*').interact()?;
            Ok(Value::String(answer))
        }
        PromptKind::Confirm => {
            let initial = spec.default.as_ref().and_then(Value::as_bool).unwrap_or(false);
            let answer = cliclack::confirm(&spec.message)
                .initial_value(initial)
                .interact()?;
            Ok(Value::Bool(answer))
        }
        PromptKind::Number => {
            let mut input = cliclack::input(&spec.message).required(false);
            if let Some(default) = &spec.default {
                input = input.default_input(&value_to_string(default));
            }
            let answer: String = input
                .validate(|value: &String| {
                    if value.is_empty() || value.parse::<i64>().is_ok() {
                        Ok(())
                    } else {
                        Err("Enter a whole number")
                    }
                })
                .interact()?;
            match answer.parse::<i64>() {
                Ok(n) => Ok(Value::from(n)),
                Err(_) => Ok(spec
                    .default
                    .clone()
                    .unwrap_or_else(|| Value::String(String::new()))),
            }
        }
        PromptKind::List => {
            if spec.choices.is_empty() {
                anyhow::bail!("Prompt '{}' offers no choices", spec.name);
            }
            let mut select = cliclack::select(&spec.message);
            for (idx, choice) in spec.choices.iter().enumerate() {
                select = select.item(idx, choice, "");
            }
            let idx: usize = select.interact()?;
            Ok(Value::String(spec.choices[idx].clone()))
        }
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

fn resolve_destination(project_name: &str, yes: bool) -> Result<PathBuf> {
    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let destination = current_dir.join(project_name);

    if destination.exists() {
        cliclack::log::warning(format!("Directory {} already exists", destination.display()))?;
        if yes {
            anyhow::bail!("Refusing to write into an existing directory with --yes");
        }
        let confirm = cliclack::confirm("Continue anyway?")
            .initial_value(false)
            .interact()?;
        if !confirm {
            anyhow::bail!("Setup cancelled.");
        }
    }

    Ok(destination)
}

fn print_next_steps(project_name: &str, template: &Template) -> Result<()> {
    let mut steps = vec![format!("cd {}", project_name)];
    if template.body.post_install.is_empty() {
        steps.push("npm install".to_string());
        steps.push("npm run dev".to_string());
    } else {
        steps.extend(template.body.post_install.iter().cloned());
    }

    println!();
    println!("  Next steps");
    println!();
    for (i, step) in steps.iter().enumerate() {
        println!("  {}.  {}", i + 1, step.bold());
    }

    cliclack::outro("Happy building!")?;

    Ok(())
}

fn print_registry_hints() -> Result<()> {
    cliclack::log::info("Troubleshooting:")?;
    cliclack::log::info("  - Check your internet connection")?;
    cliclack::log::info("  - Inspect stored credentials with: kickoff auth --view")?;
    cliclack::log::info("  - Private template repositories need a token: kickoff auth --setup")?;
    Ok(())
}

/// List every template in the catalog, grouped by category.
pub async fn list() -> Result<()> {
    let catalog = Catalog::new(Transport::new(AuthStore::new()));

    let spinner = cliclack::spinner();
    spinner.start("Loading templates...");
    let templates = match catalog.list_templates().await {
        Ok(templates) => templates,
        Err(e) => {
            spinner.stop("Failed to load templates");
            print_registry_hints()?;
            return Err(e.into());
        }
    };
    spinner.stop(format!("{} templates available", templates.len()));

    // Group by category, preserving catalog order
    let mut groups: Vec<(&str, Vec<&Template>)> = Vec::new();
    for template in &templates {
        let category = category_of(template);
        match groups.iter_mut().find(|(c, _)| *c == category) {
            Some((_, members)) => members.push(template),
            None => groups.push((category, vec![template])),
        }
    }

    println!();
    for (category, members) in &groups {
        println!("  {}", category.to_uppercase().cyan().bold());
        for template in members {
            println!(
                "    {}  {}",
                template.key.green().bold(),
                template.body.description.dimmed()
            );
            if !template.body.stack.is_empty() {
                println!("      {}", template.body.stack.join(", ").blue());
            }
        }
        println!();
    }
    println!(
        "  Run {} to scaffold a project",
        "kickoff <project-name> [template]".bold()
    );
    println!();

    Ok(())
}

/// Show the full descriptor of one template.
pub async fn info(key: &str) -> Result<()> {
    let catalog = Catalog::new(Transport::new(AuthStore::new()));

    let spinner = cliclack::spinner();
    spinner.start(format!("Loading '{}'...", key));
    let template = match catalog.template(key).await {
        Ok(template) => template,
        Err(Error::TemplateNotFound { .. }) => {
            spinner.stop("Template not found");
            let available: Vec<String> = catalog
                .list_templates()
                .await?
                .into_iter()
                .map(|t| t.key)
                .collect();
            anyhow::bail!(
                "Template '{}' not found. Available templates: {}",
                key,
                available.join(", ")
            );
        }
        Err(e) => {
            spinner.stop("Failed to load template");
            print_registry_hints()?;
            return Err(e.into());
        }
    };
    let config = catalog.template_config(&template.key).await;
    spinner.stop(format!("{}", template.body.name.bold()));

    let body = &template.body;
    println!();
    println!("  {}", body.description);
    println!();
    print_field("Key", &template.key.green().to_string());
    print_field("Category", category_of(&template));
    if !body.stack.is_empty() {
        print_field("Stack", &body.stack.join(", "));
    }
    if !body.features.is_empty() {
        println!("  {}", "Features".cyan());
        for feature in &body.features {
            println!("    - {}", feature);
        }
    }
    if !body.supports.is_empty() {
        print_field("Supports", &body.supports.join(", "));
    }

    let variables = &body.variables;
    if !variables.required.is_empty() {
        print_field("Required variables", &variables.required.join(", "));
    }
    if !variables.optional.is_empty() {
        print_field("Optional variables", &variables.optional.join(", "));
    }
    if !variables.generated.is_empty() {
        print_field("Generated variables", &variables.generated.join(", "));
    }
    if !config.prompts.is_empty() {
        print_field("Prompts", &config.prompts.len().to_string());
    }
    if !body.post_install.is_empty() {
        println!("  {}", "After scaffolding".cyan());
        for step in &body.post_install {
            println!("    $ {}", step);
        }
    }
    println!();

    Ok(())
}

/// Force-refresh the catalog cache.
pub async fn update() -> Result<()> {
    let catalog = Catalog::new(Transport::new(AuthStore::new()));

    let spinner = cliclack::spinner();
    spinner.start("Refreshing template catalog...");
    let templates = match catalog.refresh().await {
        Ok(templates) => templates,
        Err(e) => {
            spinner.stop("Refresh failed");
            print_registry_hints()?;
            return Err(e.into());
        }
    };
    spinner.stop(format!("Catalog refreshed: {} templates", templates.len()));

    for template in &templates {
        cliclack::log::info(format!("{} - {}", template.key, template.body.name))?;
    }

    Ok(())
}

/// Manage stored GitHub credentials.
pub fn auth(args: AuthArgs) -> Result<()> {
    let store = AuthStore::new();

    if args.view {
        return view_credentials(&store);
    }
    if args.clear {
        return clear_credentials(&store);
    }
    if args.setup {
        return setup_credentials(&store);
    }

    cliclack::intro("GitHub authentication")?;
    let action: &str = cliclack::select("What would you like to do?")
        .item("setup", "Set up a personal access token", "")
        .item("view", "View stored credentials", "")
        .item("clear", "Clear stored credentials", "")
        .interact()?;

    match action {
        "setup" => setup_credentials(&store),
        "view" => view_credentials(&store),
        "clear" => clear_credentials(&store),
        _ => Ok(()),
    }
}

fn setup_credentials(store: &AuthStore) -> Result<()> {
    cliclack::log::info("A personal access token lets kickoff read private template repositories.")?;
    cliclack::log::info(format!(
        "Create one with the 'repo' scope at {}",
        TOKEN_SETTINGS_URL
    ))?;

    let open_page = cliclack::confirm("Open the token settings page in your browser?")
        .initial_value(false)
        .interact()?;
    if open_page {
        if let Err(e) = open::that(TOKEN_SETTINGS_URL) {
            cliclack::log::warning(format!("Could not open browser: {}", e))?;
        }
    }

    let token: String = cliclack::password("Paste your token")
        .mask('*')
        .validate(|input: &String| {
            if input.starts_with("ghp_") || input.starts_with("github_pat_") {
                Ok(())
            } else {
                Err("GitHub tokens start with ghp_ or github_pat_")
            }
        })
        .interact()?;

    let username: String = cliclack::input("GitHub username (optional)")
        .required(false)
        .interact()?;

    store.save(&Credentials {
        token: Some(token),
        username: if username.is_empty() {
            None
        } else {
            Some(username)
        },
    })?;
    cliclack::log::success(format!(
        "Credentials saved to {}",
        store.config_path().display()
    ))?;

    if AuthStore::env_token().is_some() {
        cliclack::log::warning(
            "GITHUB_TOKEN / GH_TOKEN is set in this shell and takes precedence over the saved token",
        )?;
    }

    Ok(())
}

fn view_credentials(store: &AuthStore) -> Result<()> {
    let file = store.file_credentials();

    match &file.token {
        Some(token) => cliclack::log::info(format!("Stored token: {}", mask_token(token)))?,
        None => cliclack::log::info("No stored token")?,
    }
    if let Some(username) = &file.username {
        cliclack::log::info(format!("Stored username: {}", username))?;
    }
    match AuthStore::env_token() {
        Some(token) => cliclack::log::info(format!(
            "Environment token: {} (takes precedence)",
            mask_token(&token)
        ))?,
        None => cliclack::log::info("No GITHUB_TOKEN / GH_TOKEN in the environment")?,
    }
    cliclack::log::info(format!("Credential file: {}", store.config_path().display()))?;

    Ok(())
}

fn clear_credentials(store: &AuthStore) -> Result<()> {
    let confirm = cliclack::confirm("Remove stored credentials?")
        .initial_value(false)
        .interact()?;
    if !confirm {
        cliclack::log::info("Nothing changed")?;
        return Ok(());
    }

    store.clear()?;
    cliclack::log::success("Credentials cleared")?;

    Ok(())
}

fn print_field(label: &str, value: &str) {
    println!("  {:<22} {}", label.cyan(), value);
}

fn mask_token(token: &str) -> String {
    // Char-based so a hand-edited multi-byte token cannot split a code point.
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        "****".to_string()
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

fn valid_project_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn valid_email(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
