use clap::Parser;

/// Command-line arguments. Flags override the configuration file.
#[derive(Parser, Debug)]
#[command(
    name = "aioftpd",
    about = "All-in-one file transfer server (FTP + TFTP) serving a single directory tree."
)]
pub struct Cli {
    /// Data directory to serve.
    pub data: Option<String>,

    /// Path to the configuration file.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Users in the format 'name:pass:uid:path:perm[,name2:...]'.
    #[arg(long)]
    pub user: Option<String>,

    /// Enable the FTP server.
    #[arg(long)]
    pub ftp: bool,

    /// FTP control port.
    #[arg(long)]
    pub ftp_port: Option<u16>,

    /// Enable the TFTP server.
    #[arg(long)]
    pub tftp: bool,

    /// TFTP port.
    #[arg(long)]
    pub tftp_port: Option<u16>,

    /// Account TFTP transfers run as.
    #[arg(long)]
    pub tftp_user: Option<String>,

    /// Log level (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}
