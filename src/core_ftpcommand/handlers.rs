use std::io;

use crate::core_ftpcommand::ftpcommand::FtpCommand;
use crate::core_ftpcommand::{
    cwd, dele, feat, list, mdtm, mkd, mlsd, noop, opts, pass, pwd, quit, retr, rmd, size, stor,
    syst, type_, user,
};
use crate::core_network::connection::FtpConnection;
use crate::core_network::{pasv, port};

/// Routes one parsed command to its handler. Returns `false` when the
/// session should end (QUIT).
pub async fn dispatch(
    conn: &mut FtpConnection,
    command: FtpCommand,
    arg: &str,
) -> io::Result<bool> {
    match command {
        FtpCommand::Quit => {
            quit::handle_quit_command(conn, arg).await?;
            return Ok(false);
        }
        FtpCommand::User => user::handle_user_command(conn, arg).await?,
        FtpCommand::Pass => pass::handle_pass_command(conn, arg).await?,
        FtpCommand::Syst => syst::handle_syst_command(conn, arg).await?,
        FtpCommand::Pwd => pwd::handle_pwd_command(conn, arg).await?,
        FtpCommand::Type => type_::handle_type_command(conn, arg).await?,
        FtpCommand::Feat => feat::handle_feat_command(conn, arg).await?,
        FtpCommand::Opts => opts::handle_opts_command(conn, arg).await?,
        FtpCommand::Noop => noop::handle_noop_command(conn, arg).await?,
        FtpCommand::Pasv => pasv::handle_pasv_command(conn, arg).await?,
        FtpCommand::Epsv => pasv::handle_epsv_command(conn, arg).await?,
        FtpCommand::Port => port::handle_port_command(conn, arg).await?,
        FtpCommand::Cwd => cwd::handle_cwd_command(conn, arg).await?,
        FtpCommand::List | FtpCommand::Nlst => list::handle_list_command(conn, arg).await?,
        FtpCommand::Mlsd => mlsd::handle_mlsd_command(conn, arg).await?,
        FtpCommand::Retr => retr::handle_retr_command(conn, arg).await?,
        FtpCommand::Stor => stor::handle_stor_command(conn, arg).await?,
        FtpCommand::Dele => dele::handle_dele_command(conn, arg).await?,
        FtpCommand::Mkd => mkd::handle_mkd_command(conn, arg).await?,
        FtpCommand::Rmd => rmd::handle_rmd_command(conn, arg).await?,
        FtpCommand::Size => size::handle_size_command(conn, arg).await?,
        FtpCommand::Mdtm => mdtm::handle_mdtm_command(conn, arg).await?,
    }

    Ok(true)
}
