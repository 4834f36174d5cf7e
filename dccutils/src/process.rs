use netstat2::{AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, get_sockets_info};
use std::fmt;
use sysinfo::{Pid, System, Users};

/// Informations sur un processus utilisant un port réseau.
#[derive(Debug, Clone)]
pub struct ProcessPortInfo {
    pub pid: u32,
    pub process_name: String,
    pub owner: String,
    pub port: u16,
}

impl fmt::Display for ProcessPortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (pid {}, user {}) on port {}",
            self.process_name, self.pid, self.owner, self.port
        )
    }
}

/// Protocole de transport utilisé pour la recherche.
#[derive(Debug, Clone, Copy)]
pub enum TransportProtocol {
    Tcp,
    Udp,
}

/// Tente de trouver le processus qui écoute sur `port` pour le protocole donné.
///
/// Sert uniquement au diagnostic d'un échec de `bind` : retourne `None` si
/// rien n'a pu être identifié (droits insuffisants, socket déjà fermée...).
pub fn find_process_using_port(port: u16, protocol: TransportProtocol) -> Option<ProcessPortInfo> {
    let proto_flag = match protocol {
        TransportProtocol::Tcp => ProtocolFlags::TCP,
        TransportProtocol::Udp => ProtocolFlags::UDP,
    };

    let sockets = get_sockets_info(
        AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6,
        proto_flag,
    )
    .ok()?;

    let local_port = |info: &ProtocolSocketInfo| match info {
        ProtocolSocketInfo::Tcp(tcp) => tcp.local_port,
        ProtocolSocketInfo::Udp(udp) => udp.local_port,
    };

    let pid = sockets
        .iter()
        .filter(|socket| local_port(&socket.protocol_socket_info) == port)
        .find_map(|socket| socket.associated_pids.first().copied())?;

    let mut system = System::new_all();
    system.refresh_all();
    let users = Users::new_with_refreshed_list();

    let process = system.process(Pid::from_u32(pid))?;
    let owner = process
        .user_id()
        .and_then(|uid| users.get_user_by_id(uid))
        .map(|user| user.name().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    Some(ProcessPortInfo {
        pid,
        process_name: process.name().to_string(),
        owner,
        port,
    })
}
