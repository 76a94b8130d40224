use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use tracing::info;

use crate::cli::{ProfileAction, ProfileArgs, ProfileCreateArgs, ProfileShowArgs, ProfileUpdateArgs};
use crate::db::{open_database, resolve_db_path, table_count};
use crate::model::{Role, UserProfile};
use crate::session::{establish_optional, establish_required, load_profile, profile_id_for, save_profile};
use crate::util::now_utc_string;

pub fn run(args: ProfileArgs) -> Result<()> {
    let db_path = resolve_db_path(&args.cache_root, args.db_path.clone());
    let connection = open_database(&db_path)?;

    match args.action {
        ProfileAction::Show(show) => show_profile(&connection, &show),
        ProfileAction::Create(create) => create_profile(&connection, &create),
        ProfileAction::Update(update) => update_profile(&connection, &update),
    }
}

fn show_profile(connection: &Connection, args: &ProfileShowArgs) -> Result<()> {
    let profile = load_profile(connection, &args.email)?
        .with_context(|| format!("no profile found for {}", args.email))?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "User id:    {}", profile.user_id)?;
    writeln!(output, "Name:       {}", profile.name)?;
    writeln!(output, "Email:      {}", profile.email)?;
    writeln!(output, "Role:       {}", profile.role.as_str())?;
    writeln!(output, "Created at: {}", profile.created_at)?;
    if let Some(photo_url) = &profile.photo_url {
        writeln!(output, "Photo:      {photo_url}")?;
    }
    output.flush()?;

    Ok(())
}

pub(crate) fn create_profile(connection: &Connection, args: &ProfileCreateArgs) -> Result<()> {
    if load_profile(connection, &args.email)?.is_some() {
        bail!("a profile already exists for {}", args.email);
    }

    // The first profile bootstraps the database and may take any role;
    // after that, assigning an elevated role needs an Admin session.
    let bootstrap = table_count(connection, "profiles")? == 0;
    if !bootstrap && args.role != Role::ReadOnly {
        let session = establish_required(
            connection,
            args.as_user.as_deref(),
            "assigning an elevated role requires --as <admin email>",
        )?;
        session.require_admin()?;
    }

    let profile = UserProfile {
        user_id: profile_id_for(&args.email),
        name: args.name.clone(),
        email: args.email.clone(),
        role: args.role,
        created_at: now_utc_string(),
        photo_url: None,
    };
    save_profile(connection, &profile)?;
    info!(email = %profile.email, role = profile.role.as_str(), "profile created");

    Ok(())
}

pub(crate) fn update_profile(connection: &Connection, args: &ProfileUpdateArgs) -> Result<()> {
    let mut profile = load_profile(connection, &args.email)?
        .with_context(|| format!("no profile found for {}", args.email))?;

    if args.name.is_none() && args.role.is_none() && args.photo_url.is_none() {
        bail!("nothing to update: pass --name, --role, or --photo-url");
    }

    if let Some(session) = establish_optional(connection, args.as_user.as_deref())? {
        session.require_writer()?;
    }

    if let Some(role) = args.role {
        let session = establish_required(
            connection,
            args.as_user.as_deref(),
            "changing a role requires --as <admin email>",
        )?;
        session.require_admin()?;
        profile.role = role;
    }
    if let Some(name) = &args.name {
        profile.name = name.clone();
    }
    if let Some(photo_url) = &args.photo_url {
        profile.photo_url = Some(photo_url.clone());
    }

    save_profile(connection, &profile)?;
    info!(email = %profile.email, role = profile.role.as_str(), "profile updated");

    Ok(())
}
