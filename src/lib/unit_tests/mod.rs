// SPDX-License-Identifier: Apache-2.0

mod apply;
mod generate;
mod persist;

use std::collections::{HashMap, VecDeque};

use nix::errno::Errno;

use crate::{
    NcmError, NetlinkChannel, NetlinkFailure, NetlinkRequest, NetworkDaemon,
};

/// Records every request, failing them with the queued errors first.
#[derive(Debug, Default)]
pub(crate) struct MockChannel {
    pub(crate) links: HashMap<String, VecDeque<u32>>,
    pub(crate) failures: VecDeque<Errno>,
    pub(crate) requests: Vec<NetlinkRequest>,
    pub(crate) lookups: usize,
}

impl MockChannel {
    pub(crate) fn with_link(name: &str, index: u32) -> Self {
        let mut channel = Self::default();
        channel.links.insert(name.to_string(), VecDeque::from([index]));
        channel
    }
}

impl NetlinkChannel for MockChannel {
    async fn link_index(&mut self, name: &str) -> Result<u32, NetlinkFailure> {
        self.lookups += 1;
        let indexes = self
            .links
            .get_mut(name)
            .ok_or(NetlinkFailure::Errno(Errno::ENODEV as i32))?;
        // The last index stays valid once the queue is drained
        if indexes.len() > 1 {
            indexes
                .pop_front()
                .ok_or(NetlinkFailure::Errno(Errno::ENODEV as i32))
        } else {
            indexes
                .front()
                .copied()
                .ok_or(NetlinkFailure::Errno(Errno::ENODEV as i32))
        }
    }

    async fn request(
        &mut self,
        req: &NetlinkRequest,
    ) -> Result<(), NetlinkFailure> {
        self.requests.push(req.clone());
        match self.failures.pop_front() {
            Some(errno) => Err(NetlinkFailure::Errno(errno as i32)),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockDaemon {
    pub(crate) reloads: usize,
    pub(crate) reconfigured: Vec<u32>,
}

impl NetworkDaemon for MockDaemon {
    async fn reload(&mut self) -> Result<(), NcmError> {
        self.reloads += 1;
        Ok(())
    }

    async fn reconfigure_link(&mut self, index: u32) -> Result<(), NcmError> {
        self.reconfigured.push(index);
        Ok(())
    }
}
