use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input, Password};
use dotenvy::dotenv;
use rollcall_cli::admin::{self, NewAdmin};
use rollcall_cli::seeder::{self, SeedConfig};

#[derive(Parser)]
#[command(name = "rollcall-cli")]
#[command(about = "Rollcall CLI - Administrative tools for Rollcall", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new admin account
    CreateAdmin {
        /// Display name of the admin
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// SAP ID used to log in
        #[arg(short = 's', long)]
        sap_id: Option<String>,

        /// Email address (optional)
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Create the default admin/admin account if it does not exist
    SeedAdmin,
    /// Seed the database with fake classes, subjects, teachers, and students
    Seed {
        /// Number of classes to create
        #[arg(short = 'c', long, default_value = "4")]
        classes: usize,

        /// Number of subjects per class (at most 16)
        #[arg(long, default_value = "5")]
        subjects: usize,

        /// Number of teachers
        #[arg(long, default_value = "6")]
        teachers: usize,

        /// Number of students per class
        #[arg(long, default_value = "30")]
        students: usize,
    },
    /// Delete all classes, subjects, attendance, tickets, and non-admin users
    ClearSeed {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    let cli = Cli::parse();

    match cli.command {
        Commands::CreateAdmin {
            name,
            sap_id,
            email,
            password,
        } => handle_create_admin(&pool, name, sap_id, email, password).await,
        Commands::SeedAdmin => handle_seed_admin(&pool).await,
        Commands::Seed {
            classes,
            subjects,
            teachers,
            students,
        } => handle_seed(&pool, classes, subjects, teachers, students).await,
        Commands::ClearSeed { yes } => handle_clear_seed(&pool, yes).await,
    }
}

async fn handle_create_admin(
    pool: &sqlx::postgres::PgPool,
    name: Option<String>,
    sap_id: Option<String>,
    email: Option<String>,
    password: Option<String>,
) {
    let name = name.unwrap_or_else(|| {
        Input::new()
            .with_prompt("Name")
            .interact_text()
            .expect("Failed to read name")
    });

    let sap_id = sap_id.unwrap_or_else(|| {
        Input::new()
            .with_prompt("SAP ID")
            .interact_text()
            .expect("Failed to read SAP ID")
    });

    let email = email.or_else(|| {
        let input: String = Input::new()
            .with_prompt("Email address (optional)")
            .allow_empty(true)
            .interact_text()
            .expect("Failed to read email");
        let input = input.trim().to_string();
        (!input.is_empty()).then_some(input)
    });

    let password = password.unwrap_or_else(|| {
        Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .expect("Failed to read password")
    });

    let new_admin = NewAdmin {
        name: name.trim(),
        sap_id: sap_id.trim(),
        email: email.as_deref(),
        password: &password,
    };

    match admin::create_admin(pool, &new_admin).await {
        Ok(_) => {
            println!("\n✅ Admin created successfully!");
            println!("   SAP ID: {}", new_admin.sap_id);
            println!("   Name: {}", new_admin.name);
        }
        Err(e) => {
            eprintln!("\n❌ Error creating admin: {}", e);
            std::process::exit(1);
        }
    }
}

async fn handle_seed_admin(pool: &sqlx::postgres::PgPool) {
    match admin::seed_default_admin(pool).await {
        Ok(true) => {
            println!("✅ Default admin created");
            println!(
                "   SAP ID: {} / Password: {}",
                admin::DEFAULT_ADMIN_SAP_ID,
                admin::DEFAULT_ADMIN_PASSWORD
            );
        }
        Ok(false) => {
            println!(
                "ℹ️  User with SAP ID '{}' already exists, nothing to do",
                admin::DEFAULT_ADMIN_SAP_ID
            );
        }
        Err(e) => {
            eprintln!("\n❌ Error seeding admin: {}", e);
            std::process::exit(1);
        }
    }
}

async fn handle_seed(
    pool: &sqlx::postgres::PgPool,
    classes: usize,
    subjects: usize,
    teachers: usize,
    students: usize,
) {
    if subjects > seeder::MAX_SUBJECTS_PER_CLASS {
        println!(
            "⚠️  Capping subjects per class at {}",
            seeder::MAX_SUBJECTS_PER_CLASS
        );
    }

    let config = SeedConfig::new(classes)
        .with_subjects(subjects)
        .with_teachers(teachers)
        .with_students(students);

    if let Err(e) = seeder::seed_all(pool, config).await {
        eprintln!("\n❌ Error seeding database: {}", e);
        std::process::exit(1);
    }
}

async fn handle_clear_seed(pool: &sqlx::postgres::PgPool, yes: bool) {
    let confirmed = yes
        || Confirm::new()
            .with_prompt("Delete all classes, subjects, attendance, tickets and non-admin users?")
            .default(false)
            .interact()
            .expect("Failed to read confirmation");

    if !confirmed {
        println!("Aborted");
        return;
    }

    if let Err(e) = seeder::clear_all(pool).await {
        eprintln!("\n❌ Error clearing seeded data: {}", e);
        std::process::exit(1);
    }
}
