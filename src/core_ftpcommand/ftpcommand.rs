/// The FTP verbs this server understands. Obsolete X-forms map onto their
/// modern equivalents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FtpCommand {
    User,
    Pass,
    Quit,
    Syst,
    Pwd,
    Type,
    Feat,
    Opts,
    Noop,
    Pasv,
    Epsv,
    Port,
    Cwd,
    List,
    Nlst,
    Mlsd,
    Retr,
    Stor,
    Dele,
    Mkd,
    Rmd,
    Size,
    Mdtm,
}

impl FtpCommand {
    pub fn from_verb(verb: &str) -> Option<FtpCommand> {
        match verb.to_ascii_uppercase().as_str() {
            "USER" => Some(FtpCommand::User),
            "PASS" => Some(FtpCommand::Pass),
            "QUIT" => Some(FtpCommand::Quit),
            "SYST" => Some(FtpCommand::Syst),
            "PWD" | "XPWD" => Some(FtpCommand::Pwd),
            "TYPE" => Some(FtpCommand::Type),
            "FEAT" => Some(FtpCommand::Feat),
            "OPTS" => Some(FtpCommand::Opts),
            "NOOP" => Some(FtpCommand::Noop),
            "PASV" => Some(FtpCommand::Pasv),
            "EPSV" => Some(FtpCommand::Epsv),
            "PORT" => Some(FtpCommand::Port),
            "CWD" => Some(FtpCommand::Cwd),
            "LIST" => Some(FtpCommand::List),
            "NLST" => Some(FtpCommand::Nlst),
            "MLSD" => Some(FtpCommand::Mlsd),
            "RETR" => Some(FtpCommand::Retr),
            "STOR" => Some(FtpCommand::Stor),
            "DELE" => Some(FtpCommand::Dele),
            "MKD" | "XMKD" => Some(FtpCommand::Mkd),
            "RMD" | "XRMD" => Some(FtpCommand::Rmd),
            "SIZE" => Some(FtpCommand::Size),
            "MDTM" => Some(FtpCommand::Mdtm),
            _ => None,
        }
    }
}
