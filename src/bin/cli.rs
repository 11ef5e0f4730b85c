//! LMS CLI Client
//!
//! Command-line interface for talking to an LMS server.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use lms::client::Row;
use lms::LmsClient;

/// LMS CLI
#[derive(Parser, Debug)]
#[command(name = "lms-cli")]
#[command(about = "CLI for the LMS line protocol")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:5051")]
    server: String,

    /// Acting user id
    #[arg(short, long, default_value = "student")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and print the role and display name
    Login {
        /// Password for --user
        password: String,
    },

    /// List students
    Students,

    /// Send a chat message from --user
    Chat {
        /// Recipient id
        to: String,

        /// Message text
        message: String,
    },

    /// Show the conversation between --user and another user
    History {
        /// The other user's id
        with: String,
    },

    /// List assignments
    Assignments,

    /// Create an assignment
    AssignCreate { title: String, summary: String },

    /// Update an assignment
    AssignUpdate { task_id: String, title: String, summary: String },

    /// Delete an assignment
    AssignDelete { task_id: String },

    /// Submit a file for an assignment
    Submit {
        task_id: String,

        /// Local file to upload
        path: PathBuf,
    },

    /// List submissions for an assignment
    Submissions { task_id: String },

    /// Download a stored submission
    Download {
        /// Stored file reference from `submissions`
        file_path: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List notices
    Notices,

    /// Post a notice
    NoticeCreate { content: String },

    /// Replace a notice's content
    NoticeUpdate { notice_id: String, content: String },

    /// Delete a notice
    NoticeDelete { notice_id: String },

    /// List videos with --user's progress
    Videos,

    /// Mark a video as watched by --user
    Watch { video_id: String },

    /// Register an already stored video file
    VideoCreate { week_id: String, file_name: String },

    /// Delete a video and its file
    VideoDelete { video_id: String },

    /// Upload a video file for a week
    VideoUpload {
        week_id: String,

        /// Local file to upload
        path: PathBuf,
    },

    /// Show per-student progress for a video
    Progress { video_id: String },
}

fn main() {
    let args = Args::parse();
    let client = LmsClient::new(&args.server);

    if let Err(e) = run(&client, &args.user, args.command) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(client: &LmsClient, user: &str, command: Commands) -> lms::Result<()> {
    match command {
        Commands::Login { password } => {
            let session = client.login(user, &password)?;
            println!("{} {}", session.role, session.display_name);
        }
        Commands::Students => print_rows(&client.list_students(user)?),
        Commands::Chat { to, message } => {
            client.post_chat(user, &to, &message)?;
            println!("OK");
        }
        Commands::History { with } => print_rows(&client.chat_history(user, &with)?),

        Commands::Assignments => print_rows(&client.list_assignments(user)?),
        Commands::AssignCreate { title, summary } => {
            client.create_assignment(user, &title, &summary)?;
            println!("OK");
        }
        Commands::AssignUpdate { task_id, title, summary } => {
            client.update_assignment(user, &task_id, &title, &summary)?;
            println!("OK");
        }
        Commands::AssignDelete { task_id } => {
            client.delete_assignment(user, &task_id)?;
            println!("OK");
        }
        Commands::Submit { task_id, path } => {
            client.submit_file(user, &task_id, &path)?;
            println!("DONE");
        }
        Commands::Submissions { task_id } => print_rows(&client.list_submissions(user, &task_id)?),
        Commands::Download { file_path, output } => match output {
            Some(path) => {
                let mut out = BufWriter::new(File::create(&path)?);
                let bytes = client.download_file(user, &file_path, &mut out)?;
                eprintln!("{} bytes written to {}", bytes, path.display());
            }
            None => {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                client.download_file(user, &file_path, &mut out)?;
            }
        },

        Commands::Notices => print_rows(&client.list_notices(user)?),
        Commands::NoticeCreate { content } => {
            client.create_notice(user, &content)?;
            println!("OK");
        }
        Commands::NoticeUpdate { notice_id, content } => {
            client.update_notice(user, &notice_id, &content)?;
            println!("OK");
        }
        Commands::NoticeDelete { notice_id } => {
            client.delete_notice(user, &notice_id)?;
            println!("OK");
        }

        Commands::Videos => print_rows(&client.list_videos(user)?),
        Commands::Watch { video_id } => {
            client.watch_video(user, &video_id)?;
            println!("OK");
        }
        Commands::VideoCreate { week_id, file_name } => {
            client.create_video(user, &week_id, &file_name)?;
            println!("OK");
        }
        Commands::VideoDelete { video_id } => {
            client.delete_video(user, &video_id)?;
            println!("OK");
        }
        Commands::VideoUpload { week_id, path } => {
            client.upload_video(user, &week_id, &path)?;
            println!("DONE");
        }
        Commands::Progress { video_id } => print_rows(&client.list_progress(user, &video_id)?),
    }
    Ok(())
}

fn print_rows(rows: &[Row]) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for row in rows {
        let _ = writeln!(out, "{}", row.join("\t"));
    }
    if rows.is_empty() {
        let _ = writeln!(out, "(none)");
    }
}
