use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use log::{debug, trace};
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::{sleep, timeout, timeout_at, Instant};

use crate::error::SourceQueryError;
use crate::info::ServerInfo;
use crate::packet::{
    RequestPacket, RequestType, ResponsePacket, ResponseType, INFO_PAYLOAD, NO_CHALLENGE,
};
use crate::players::{PlayerInfo, Rule};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Attempts per request while the server keeps answering with challenges.
const MAX_ATTEMPTS: usize = 3;
const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Source query responses are at most 1400 bytes + IP/UDP headers, but some
/// games (Rust...) send more.
const RECV_BUFFER_SIZE: usize = 4096;

/// Which queries a server answered, as obtained by [Client::check_features].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerFeatures {
    /// Always true, A2S_INFO is what every other query builds on.
    pub info: bool,
    pub players: bool,
    pub rules: bool,
    /// Reserved, never queried.
    pub ping: bool,
}

/// A2S client bound to a single server.
///
/// The client caches the challenge number the server hands out and reuses it
/// for every later A2S_PLAYER and A2S_RULES request until it reconnects.
/// Methods take `&mut self`: one query at a time.
///
/// ## Example
/// ```no_run
/// use a2squery::query::Client;
/// use std::error::Error;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn Error>> {
///     let mut client = Client::new(None);
///     client.connect("nyc-1.us.uncletopia.com:27015").await?;
///
///     let info = client.info().await?;
///     let players = client.players().await?;
///     println!("{}: {}/{}", info.name, players.len(), info.max_players);
///
///     client.close();
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Client {
    socket: Option<UdpSocket>,
    challenge: Option<i32>,
    timeout: Duration,
}

impl Client {
    /// If `timeout_dur` is `Some(Duration)`, it bounds connecting and every
    /// send/receive pair. The default is 5 seconds if `timeout_dur` is `None`.
    pub fn new(timeout_dur: Option<Duration>) -> Self {
        Client {
            socket: None,
            challenge: None,
            timeout: timeout_dur.unwrap_or(DEFAULT_TIMEOUT),
        }
    }

    /// Resolve `host` and open a UDP association with it.
    ///
    /// Any previous association and its challenge are dropped.
    pub async fn connect(&mut self, host: &str) -> Result<(), SourceQueryError> {
        self.close();

        let addr: SocketAddr = timeout(self.timeout, lookup_host(host))
            .await?
            .map_err(SourceQueryError::UnreachableHost)?
            .next()
            .ok_or_else(|| {
                SourceQueryError::UnreachableHost(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} did not resolve to any address", host),
                ))
            })?;

        // just arbitrarily bind any port of the same family, doesn't matter really
        let local: SocketAddr = if addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let sock: UdpSocket = UdpSocket::bind(local)
            .await
            .map_err(SourceQueryError::FailedPortBind)?;

        timeout(self.timeout, sock.connect(addr))
            .await?
            .map_err(SourceQueryError::UnreachableHost)?;

        debug!("connected to {} from {:?}", addr, sock.local_addr().ok());
        self.socket = Some(sock);
        Ok(())
    }

    /// Release the UDP association. Does nothing if not connected.
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            trace!("closed udp socket");
        }
        self.challenge = None;
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// Query A2S_INFO.
    ///
    /// Expects a Source response first. If that fails for any reason the
    /// request is repeated once, this time expecting the GoldSource format.
    pub async fn info(&mut self) -> Result<ServerInfo, SourceQueryError> {
        if !self.is_connected() {
            return Err(SourceQueryError::NotConnected);
        }

        match self
            .send_request(RequestType::Info, INFO_PAYLOAD, ResponseType::SourceInfo)
            .await
        {
            Ok(body) => ServerInfo::from_source(&body),
            Err(err) => {
                debug!("source info query failed ({}), retrying as goldsource", err);
                let body = self
                    .send_request(RequestType::Info, INFO_PAYLOAD, ResponseType::GoldSourceInfo)
                    .await?;
                ServerInfo::from_goldsource(&body)
            }
        }
    }

    /// Query A2S_PLAYER.
    pub async fn players(&mut self) -> Result<Vec<PlayerInfo>, SourceQueryError> {
        let body = self
            .challenged_request(RequestType::Player, ResponseType::Player)
            .await?;
        PlayerInfo::parse_list(&body)
    }

    /// Query A2S_RULES.
    pub async fn rules(&mut self) -> Result<Vec<Rule>, SourceQueryError> {
        let body = self
            .challenged_request(RequestType::Rules, ResponseType::Rules)
            .await?;
        Rule::parse_list(&body)
    }

    /// Find out which queries the server answers by running them.
    ///
    /// This costs real round trips and refreshes the cached challenge.
    pub async fn check_features(&mut self) -> ServerFeatures {
        let players = self.players().await;
        if let Err(err) = &players {
            debug!("players query unsupported: {}", err);
        }

        let rules = self.rules().await;
        if let Err(err) = &rules {
            debug!("rules query unsupported: {}", err);
        }

        ServerFeatures {
            info: true,
            players: players.is_ok(),
            rules: rules.is_ok(),
            ping: false,
        }
    }

    /// Ask for a challenge, then send the real request with it.
    async fn challenged_request(
        &mut self,
        request_type: RequestType,
        expect: ResponseType,
    ) -> Result<Vec<u8>, SourceQueryError> {
        if !self.is_connected() {
            return Err(SourceQueryError::NotConnected);
        }

        let request = RequestPacket::challenge_request(request_type);
        match self.send_recv(&request, ResponseType::Challenge).await {
            Ok(_) | Err(SourceQueryError::ChallengeRequired(_)) => {}
            Err(err) => return Err(err),
        }

        if self.challenge.is_none() {
            return Err(SourceQueryError::ChallengeNotReceived);
        }

        self.send_request(request_type, &[], expect).await
    }

    /// Send a request, answering up to [MAX_ATTEMPTS] challenges.
    ///
    /// The packet is rebuilt for every attempt so it carries the challenge
    /// captured by the previous one. Any other error aborts immediately.
    async fn send_request(
        &mut self,
        request_type: RequestType,
        payload: &[u8],
        expect: ResponseType,
    ) -> Result<Vec<u8>, SourceQueryError> {
        for attempt in 1..=MAX_ATTEMPTS {
            let packet = RequestPacket::new(request_type, payload.to_vec(), self.challenge);

            match self.send_recv(&packet, expect).await {
                Err(SourceQueryError::ChallengeRequired(_)) => {
                    debug!("challenged on attempt {}/{}", attempt, MAX_ATTEMPTS);
                    if attempt < MAX_ATTEMPTS {
                        sleep(RETRY_DELAY).await;
                    }
                }
                result => return result,
            }
        }

        Err(SourceQueryError::TooManyRetries)
    }

    /// One write and one read under a single deadline.
    ///
    /// A challenge in the response is cached before the
    /// [SourceQueryError::ChallengeRequired] is handed back. A challenge of
    /// [NO_CHALLENGE] clears the cache instead.
    async fn send_recv(
        &mut self,
        packet: &RequestPacket,
        expect: ResponseType,
    ) -> Result<Vec<u8>, SourceQueryError> {
        let sock = self.socket.as_ref().ok_or(SourceQueryError::NotConnected)?;
        let deadline = Instant::now() + self.timeout;

        // sending
        let raw = packet.pack();
        trace!("sending {:?} request: {:02X?}", packet.packet_type(), raw);
        timeout_at(deadline, sock.send(&raw))
            .await?
            .map_err(SourceQueryError::SendError)?;

        // receiving packet
        let mut resp_buf = [0u8; RECV_BUFFER_SIZE];
        let len = timeout_at(deadline, sock.recv(&mut resp_buf))
            .await?
            .map_err(SourceQueryError::ReceiveError)?;
        trace!("received {} bytes", len);

        let result = ResponsePacket::unpack(&resp_buf[..len]).and_then(|p| p.into_payload(expect));
        if let Err(SourceQueryError::ChallengeRequired(challenge)) = result {
            debug!("server issued challenge {:#010X}", challenge);
            // -1 is the "no challenge yet" marker, not a number to echo back
            self.challenge = (challenge != NO_CHALLENGE).then_some(challenge);
        }
        result
    }
}

/// Query `host` with A2S_INFO in one go.
///
/// If `timeout_dur` is `Some(Duration)`, each send/receive uses `timeout_dur`.
/// The default is 5 seconds if `timeout_dur` is `None`.
///
/// Example usage:
/// ```no_run
/// # async fn run() -> Result<(), a2squery::error::SourceQueryError> {
/// let host: &str = "nyc-1.us.uncletopia.com:27015"; // Uncletopia New York City 4
/// let info = a2squery::query::query(host, None).await?;
/// # Ok(())
/// # }
/// ```
pub async fn query(host: &str, timeout_dur: Option<Duration>) -> Result<ServerInfo, SourceQueryError> {
    let mut client = Client::new(timeout_dur);
    client.connect(host).await?;
    client.info().await
}
