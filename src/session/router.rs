//! Correlates SSRC ↔ CNAME ↔ source address ↔ session (spec.md §4.F,
//! §3 "Session Router Route"). All operations run on the pipeline
//! thread only — no internal locking.

use std::collections::HashMap;
use std::net::SocketAddr;

use crate::error::{Status, StatusResult};

pub type SessionId = u64;
pub type Ssrc = u32;

struct Route {
    ssrcs: Vec<Ssrc>,
    main_ssrc: Option<Ssrc>,
    cname: Option<String>,
    addr: Option<SocketAddr>,
    session: Option<SessionId>,
}

impl Route {
    fn empty() -> Self {
        Self { ssrcs: Vec::new(), main_ssrc: None, cname: None, addr: None, session: None }
    }
}

/// Correlates inbound packet identity (SSRC/CNAME/address) to sessions.
/// Four secondary indexes keep lookups O(1); `routes` owns the data,
/// indexed by an opaque route id.
pub struct SessionRouter {
    routes: HashMap<u64, Route>,
    next_route_id: u64,
    by_ssrc: HashMap<Ssrc, u64>,
    by_addr: HashMap<SocketAddr, u64>,
    by_cname: HashMap<String, u64>,
    by_session: HashMap<SessionId, u64>,
}

impl SessionRouter {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            next_route_id: 0,
            by_ssrc: HashMap::new(),
            by_addr: HashMap::new(),
            by_cname: HashMap::new(),
            by_session: HashMap::new(),
        }
    }

    fn new_route_id(&mut self) -> u64 {
        let id = self.next_route_id;
        self.next_route_id += 1;
        id
    }

    fn remove_route_indexes(&mut self, route_id: u64, route: &Route) {
        for ssrc in &route.ssrcs {
            self.by_ssrc.remove(ssrc);
        }
        if let Some(addr) = route.addr {
            self.by_addr.remove(&addr);
        }
        if let Some(cname) = &route.cname {
            self.by_cname.remove(cname);
        }
        if let Some(sess) = route.session {
            self.by_session.remove(&sess);
        }
        let _ = route_id;
    }

    pub fn add_session(&mut self, session: SessionId, ssrc: Ssrc, addr: SocketAddr) -> StatusResult<()> {
        if self.by_session.contains_key(&session) {
            return Err(Status::NoRoute("session already registered"));
        }
        if self.by_addr.contains_key(&addr) {
            return Err(Status::NoRoute("address already in use"));
        }

        if let Some(&route_id) = self.by_ssrc.get(&ssrc) {
            let route = self.routes.get_mut(&route_id).expect("index points to live route");
            if route.session.is_some() {
                return Err(Status::NoRoute("ssrc already attached to a session"));
            }
            route.session = Some(session);
            route.main_ssrc = Some(ssrc);
            route.addr = Some(addr);
            self.by_session.insert(session, route_id);
            self.by_addr.insert(addr, route_id);
            return Ok(());
        }

        let route_id = self.new_route_id();
        let route = Route {
            ssrcs: vec![ssrc],
            main_ssrc: Some(ssrc),
            cname: None,
            addr: Some(addr),
            session: Some(session),
        };
        self.by_ssrc.insert(ssrc, route_id);
        self.by_addr.insert(addr, route_id);
        self.by_session.insert(session, route_id);
        self.routes.insert(route_id, route);
        Ok(())
    }

    pub fn remove_session(&mut self, session: SessionId) {
        if let Some(route_id) = self.by_session.remove(&session) {
            if let Some(route) = self.routes.remove(&route_id) {
                self.remove_route_indexes(route_id, &route);
            }
        }
    }

    /// Associate `ssrc` with `cname`, creating or merging routes. If
    /// `ssrc` is the main SSRC of an existing route and `cname` differs
    /// from that route's CNAME, the whole route (session + address)
    /// migrates to the route now owning `cname`. Non-main SSRCs migrate
    /// alone, leaving their session behind.
    pub fn link_source(&mut self, ssrc: Ssrc, cname: &str) -> StatusResult<()> {
        let target_route_id = match self.by_cname.get(cname) {
            Some(&id) => id,
            None => {
                let id = self.new_route_id();
                self.routes.insert(id, Route::empty());
                self.by_cname.insert(cname.to_string(), id);
                id
            }
        };

        let Some(&source_route_id) = self.by_ssrc.get(&ssrc) else {
            // Brand new SSRC: just attach it to the CNAME's route.
            let route = self.routes.get_mut(&target_route_id).expect("just inserted or found");
            route.ssrcs.push(ssrc);
            if route.cname.is_none() {
                route.cname = Some(cname.to_string());
            }
            self.by_ssrc.insert(ssrc, target_route_id);
            return Ok(());
        };

        if source_route_id == target_route_id {
            return Ok(()); // already linked
        }

        let is_main = self.routes[&source_route_id].main_ssrc == Some(ssrc);

        if is_main {
            // The whole route — session and address — migrates.
            let mut source_route = self.routes.remove(&source_route_id).expect("looked up above");
            self.remove_route_indexes(source_route_id, &source_route);
            source_route.ssrcs.retain(|&s| s != ssrc);

            let target = self.routes.get_mut(&target_route_id).expect("looked up above");
            target.ssrcs.push(ssrc);
            target.main_ssrc = Some(ssrc);
            if target.cname.is_none() {
                target.cname = Some(cname.to_string());
            }
            target.session = source_route.session;
            target.addr = source_route.addr;
            self.by_ssrc.insert(ssrc, target_route_id);
            if let Some(sess) = target.session {
                self.by_session.insert(sess, target_route_id);
            }
            if let Some(addr) = target.addr {
                self.by_addr.insert(addr, target_route_id);
            }

            // Re-attach the remaining non-main ssrcs/cname/addr of the old route.
            if !source_route.ssrcs.is_empty() || source_route.session.is_none() {
                let kept_ssrcs = std::mem::take(&mut source_route.ssrcs);
                for s in &kept_ssrcs {
                    self.by_ssrc.insert(*s, source_route_id);
                }
                if !kept_ssrcs.is_empty() {
                    source_route.ssrcs = kept_ssrcs;
                    self.routes.insert(source_route_id, source_route);
                }
            }
        } else {
            // Only the non-main ssrc itself migrates.
            if let Some(route) = self.routes.get_mut(&source_route_id) {
                route.ssrcs.retain(|&s| s != ssrc);
                if route.ssrcs.is_empty() {
                    let removed = self.routes.remove(&source_route_id).expect("just checked empty");
                    self.remove_route_indexes(source_route_id, &removed);
                }
            }
            let target = self.routes.get_mut(&target_route_id).expect("looked up above");
            target.ssrcs.push(ssrc);
            self.by_ssrc.insert(ssrc, target_route_id);
        }

        Ok(())
    }

    pub fn unlink_source(&mut self, ssrc: Ssrc) {
        if let Some(&route_id) = self.by_ssrc.get(&ssrc) {
            self.by_ssrc.remove(&ssrc);
            if let Some(route) = self.routes.get_mut(&route_id) {
                route.ssrcs.retain(|&s| s != ssrc);
                if route.ssrcs.is_empty() {
                    let removed = self.routes.remove(&route_id).expect("just checked empty");
                    self.remove_route_indexes(route_id, &removed);
                }
            }
        }
    }

    pub fn find_by_source(&self, ssrc: Ssrc) -> Option<SessionId> {
        self.by_ssrc.get(&ssrc).and_then(|id| self.routes.get(id)).and_then(|r| r.session)
    }

    pub fn find_by_address(&self, addr: SocketAddr) -> Option<SessionId> {
        self.by_addr.get(&addr).and_then(|id| self.routes.get(id)).and_then(|r| r.session)
    }

    pub fn has_session(&self, session: SessionId) -> bool {
        self.by_session.contains_key(&session)
    }

    /// CNAME of the route a session belongs to, if SDES has linked one.
    pub fn cname_for_session(&self, session: SessionId) -> Option<&str> {
        let route_id = self.by_session.get(&session)?;
        self.routes.get(route_id)?.cname.as_deref()
    }
}

impl Default for SessionRouter {
    fn default() -> Self {
        Self::new()
    }
}
