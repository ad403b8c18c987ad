//! Interface provisioning.
//!
//! An interface goes through `Absent -> LinkCreated -> AddressAssigned -> Configured`.
//! Every side effect registers its undo step; a failure replays the undo
//! steps backwards before the error is returned.

use super::control::ControlSurface;
use super::{DeviceConfig, InterfaceConfig, Key, PeerConfig};

use std::str::FromStr;
use strum::Display;

// Error handling
use log::{error, info};
use wgtool_error::WgError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum InterfaceState {
    Absent,
    LinkCreated,
    AddressAssigned,
    Configured,
}

type Compensation<'a> = Box<dyn FnOnce() -> Result<(), WgError> + 'a>;

/**
Ordered undo steps of a partially applied operation.
*/
#[derive(Default)]
pub struct Rollback<'a> {
    steps: Vec<(String, Compensation<'a>)>,
}
impl<'a> Rollback<'a> {
    pub fn new() -> Self {
        Self { steps: vec![] }
    }
    pub fn push(&mut self, name: &str, step: impl FnOnce() -> Result<(), WgError> + 'a) {
        self.steps.push((name.to_owned(), Box::new(step)));
    }
    pub fn len(&self) -> usize {
        self.steps.len()
    }
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
    /**
    Undo every registered step, last one first.

    Returns the original error, joined with the failure of every step
    that could not be undone.
    */
    pub fn run(&mut self, original: WgError) -> WgError {
        let mut failures: Vec<WgError> = vec![];
        for (name, step) in self.steps.drain(..).rev() {
            match step() {
                Ok(()) => info!("rolled back: {}", name),
                Err(e) => {
                    error!("couldn't roll back {}: {}", name, e);
                    failures.push(e);
                }
            }
        }
        WgError::join(original, failures)
    }
    /// Forget the undo steps once everything went through.
    pub fn commit(mut self) {
        self.steps.clear();
    }
}

pub struct Provisioner<C: ControlSurface> {
    control: C,
}

impl<C: ControlSurface> Provisioner<C> {
    pub fn new(control: C) -> Self {
        Self { control }
    }
    pub fn control(&self) -> &C {
        &self.control
    }

    /**
    Create, address and configure a wireguard interface.
    On any failure the link is removed again.
    */
    pub fn create_interface(&self, config: &InterfaceConfig) -> Result<InterfaceState, WgError> {
        let name = config.name.as_str();
        let mut state = InterfaceState::Absent;
        let mut rollback = Rollback::new();

        self.control.link_add(name)?;
        state = transition(name, state, InterfaceState::LinkCreated);
        rollback.push(&format!("delete link {name}"), move || {
            self.control.link_delete(name)
        });

        self.control
            .address_add(name, &config.address)
            .map_err(|e| rollback.run(e))?;
        state = transition(name, state, InterfaceState::AddressAssigned);

        let private_key = Key::from_str(&config.private_key).map_err(|e| rollback.run(e))?;
        let listen_port = listen_port(config.listen_port).map_err(|e| rollback.run(e))?;

        let device = DeviceConfig {
            private_key: Some(private_key),
            listen_port: Some(listen_port),
            ..Default::default()
        };
        self.control
            .configure_device(name, &device)
            .map_err(|e| rollback.run(e))?;

        rollback.commit();
        state = transition(name, state, InterfaceState::Configured);
        Ok(state)
    }

    /*
     * Ask for the link removal whatever the interface state is.
     */
    pub fn delete_interface(&self, name: &str) -> Result<(), WgError> {
        self.control.link_delete(name)?;
        info!("deleted wireguard interface {}", name);
        Ok(())
    }

    /**
    Add a peer to an interface, keeping the peers it already has.

    The device is read, the new peer appended, and the whole set pushed back
    as a replacement. Concurrent calls on one interface can drop a peer;
    callers serialize them.
    */
    pub fn add_peer(&self, interface: &str, peer: PeerConfig) -> Result<(), WgError> {
        let device = self.control.device(interface)?;
        let mut peers: Vec<PeerConfig> = device.peers.iter().map(PeerConfig::from).collect();
        peers.push(peer);

        let config = DeviceConfig {
            private_key: device.private_key,
            listen_port: (device.listen_port != 0).then_some(device.listen_port),
            peers,
            replace_peers: true,
        };
        self.control.configure_device(interface, &config)?;
        info!(
            "pushed {} peer(s) to wireguard interface {}",
            config.peers.len(),
            interface
        );
        Ok(())
    }
}

fn transition(name: &str, from: InterfaceState, to: InterfaceState) -> InterfaceState {
    info!("interface {}: {} -> {}", name, from, to);
    to
}

/// A listen port must fit in 1..=65535.
pub fn listen_port(port: u32) -> Result<u16, WgError> {
    match u16::try_from(port) {
        Ok(v) if v != 0 => Ok(v),
        _ => Err(WgError::InvalidPort(port)),
    }
}
