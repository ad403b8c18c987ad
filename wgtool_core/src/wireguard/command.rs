//! Control surface driven through iproute2 (`ip`) and wireguard-tools (`wg`).

use super::control::ControlSurface;
use super::{unix_name, DeviceConfig, DeviceState, Key, Peer};
use crate::network::CidrAddress;

use pipelight_exec::Process;

// Filesystem
use std::fs;
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

// Error handling
use log::{debug, error, trace, warn};
use wgtool_error::{LibError, WgError};

#[derive(Debug, Clone)]
pub struct WgCommand {
    /// Where rendered wireguard configurations are written before being applied.
    pub conf_dir: PathBuf,
}

impl WgCommand {
    pub fn new(conf_dir: &Path) -> Self {
        Self {
            conf_dir: conf_dir.to_owned(),
        }
    }
    /*
     * Write the rendered configuration of a device.
     * The file holds the private key: it is only ever readable by its owner,
     * an existing file is tightened before anything is written to it.
     */
    fn write_conf(&self, name: &str, config: &DeviceConfig) -> Result<PathBuf, WgError> {
        fs::create_dir_all(&self.conf_dir)?;
        let path = self.conf_dir.join(format!("{name}.conf"));
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&path)?;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        file.write_all(render(config).as_bytes())?;
        Ok(path)
    }
    /*
     * Run a command and fail on anything printed to stderr.
     * Returns stdout.
     */
    fn run(cmd: &str) -> Result<Option<String>, WgError> {
        trace!("{}", cmd);
        let mut proc = Process::new();
        let res = proc.stdin(cmd).run()?;

        if let Some(stderr) = res.io.stderr {
            let message = format!("command failed: {:#?}", cmd);
            error!("{}", &message);
            error!("{}", &stderr);
            return Err(LibError::builder().msg(&message).help(&stderr).build().into());
        }
        Ok(res.io.stdout)
    }
}

impl ControlSurface for WgCommand {
    fn link_add(&self, name: &str) -> Result<(), WgError> {
        let name = unix_name(name);
        Self::run(&format!("ip link add dev {name} type wireguard"))?;
        Ok(())
    }
    fn link_delete(&self, name: &str) -> Result<(), WgError> {
        let name = unix_name(name);
        Self::run(&format!("ip link del dev {name}"))?;
        Ok(())
    }
    fn address_add(&self, name: &str, address: &CidrAddress) -> Result<(), WgError> {
        let name = unix_name(name);
        Self::run(&format!("ip address add {address} dev {name}"))?;
        Ok(())
    }
    fn device(&self, name: &str) -> Result<DeviceState, WgError> {
        let name = unix_name(name);
        let stdout = Self::run(&format!("wg show {name} dump"))?.unwrap_or_default();
        parse_dump(&name, &stdout)
    }
    /*
     * Write the configuration down and load it with wg.
     * `setconf` replaces the whole device state, `addconf` merges into it.
     */
    fn configure_device(&self, name: &str, config: &DeviceConfig) -> Result<(), WgError> {
        let name = unix_name(name);
        let path = self.write_conf(&name, config)?;

        let verb = if config.replace_peers {
            "setconf"
        } else {
            "addconf"
        };
        let res = Self::run(&format!("wg {verb} {name} {}", path.display()));
        remove_conf(&path);
        res?;

        debug!(
            "configured wireguard device {} with {} peer(s)",
            name,
            config.peers.len()
        );
        Ok(())
    }
}

/// A leftover config keeps a private key on disk: make it visible.
fn remove_conf(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            warn!("couldn't remove wireguard config {}: {}", path.display(), e);
            false
        }
    }
}

/**
Render a device configuration in the wg(8) configuration file format.
*/
pub fn render(config: &DeviceConfig) -> String {
    let mut text = "[Interface]\n".to_owned();
    if let Some(key) = &config.private_key {
        text.push_str(&format!("PrivateKey = {key}\n"));
    }
    if let Some(port) = config.listen_port {
        text.push_str(&format!("ListenPort = {port}\n"));
    }
    for peer in &config.peers {
        text.push_str("\n[Peer]\n");
        text.push_str(&format!("PublicKey = {}\n", peer.public_key));
        if let Some(key) = &peer.preshared_key {
            text.push_str(&format!("PresharedKey = {key}\n"));
        }
        if let Some(endpoint) = &peer.endpoint {
            text.push_str(&format!("Endpoint = {endpoint}\n"));
        }
        if !peer.allowed_ips.is_empty() {
            let ips: Vec<String> = peer.allowed_ips.iter().map(|e| e.to_string()).collect();
            text.push_str(&format!("AllowedIPs = {}\n", ips.join(", ")));
        }
        if let Some(keepalive) = &peer.keepalive {
            text.push_str(&format!("PersistentKeepalive = {}\n", keepalive.as_secs()));
        }
    }
    text
}

/**
Parse the output of `wg show <name> dump`.

The first line describes the device:
  private-key public-key listen-port fwmark
Every following line is a peer:
  public-key preshared-key endpoint allowed-ips latest-handshake rx tx keepalive
Fields are tab separated, unset values read "(none)" or "off".
*/
pub fn parse_dump(name: &str, dump: &str) -> Result<DeviceState, WgError> {
    let mut lines = dump.lines().filter(|e| !e.trim().is_empty());

    let mut device = DeviceState {
        name: name.to_owned(),
        ..Default::default()
    };
    let Some(head) = lines.next() else {
        let message = format!("empty wireguard dump for device {name}");
        return Err(LibError::builder()
            .msg(&message)
            .help("Is it a wireguard interface?")
            .build()
            .into());
    };
    let fields: Vec<&str> = head.split('\t').collect();
    if fields.len() < 3 {
        return Err(malformed(name, head));
    }
    device.private_key = optional_key(fields[0])?;
    device.public_key = optional_key(fields[1])?;
    device.listen_port = fields[2].parse().map_err(|_| malformed(name, head))?;

    for line in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 8 {
            return Err(malformed(name, line));
        }
        let mut peer = Peer {
            public_key: Key::from_str(fields[0])?,
            preshared_key: optional_key(fields[1])?.unwrap_or_default(),
            ..Default::default()
        };
        if let Some(endpoint) = unset(fields[2]) {
            let endpoint = SocketAddr::from_str(endpoint)
                .map_err(|e| WgError::InvalidAddress(format!("{endpoint}: {e}")))?;
            peer.endpoint = Some(endpoint);
        }
        if let Some(ips) = unset(fields[3]) {
            for ip in ips.split(',') {
                peer.allowed_ips.push(CidrAddress::from_str(ip.trim())?);
            }
        }
        peer.last_handshake = fields[4].parse().map_err(|_| malformed(name, line))?;
        peer.rx_bytes = fields[5].parse().map_err(|_| malformed(name, line))?;
        peer.tx_bytes = fields[6].parse().map_err(|_| malformed(name, line))?;
        if let Some(keepalive) = unset(fields[7]) {
            let secs: u64 = keepalive.parse().map_err(|_| malformed(name, line))?;
            peer.keepalive = Duration::from_secs(secs);
        }
        device.peers.push(peer);
    }
    Ok(device)
}

fn unset(field: &str) -> Option<&str> {
    match field.trim() {
        "" | "(none)" | "off" => None,
        v => Some(v),
    }
}
fn optional_key(field: &str) -> Result<Option<Key>, WgError> {
    unset(field).map(Key::from_str).transpose()
}
fn malformed(name: &str, line: &str) -> WgError {
    let message = format!("unexpected wireguard dump line for device {name}");
    LibError::builder().msg(&message).help(line).build().into()
}
