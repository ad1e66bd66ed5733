use crate::error::SourceQueryError;
use crate::parse::Cursor;

/// Server type as reported in A2S_INFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerType {
    /// `d`: Dedicated
    Dedicated,
    /// `l`: Listen (non-dedicated)
    Listen,
    /// `p`: SourceTV relay (proxy)
    Proxy,
    Unknown(u8),
}

impl From<u8> for ServerType {
    fn from(byte: u8) -> Self {
        match byte {
            b'd' | b'D' => ServerType::Dedicated,
            b'l' | b'L' => ServerType::Listen,
            b'p' | b'P' => ServerType::Proxy,
            n => ServerType::Unknown(n),
        }
    }
}

impl Default for ServerType {
    fn default() -> Self {
        ServerType::Unknown(0)
    }
}

/// Operating system of the server as reported in A2S_INFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// `l`: Linux
    Linux,
    /// `w`: Windows
    Windows,
    /// `m` or `o`: Mac
    Mac,
    Unknown(u8),
}

impl From<u8> for Environment {
    fn from(byte: u8) -> Self {
        match byte {
            b'l' | b'L' => Environment::Linux,
            b'w' | b'W' => Environment::Windows,
            b'm' | b'o' | b'M' | b'O' => Environment::Mac,
            n => Environment::Unknown(n),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Unknown(0)
    }
}

/// SourceTV relay advertised through the extra data flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTv {
    /// Spectator port
    pub port: u16,
    /// Name of the spectator server
    pub name: String,
}

/// Server information as obtained by [crate::query::Client::info].
///
/// Fields the server did not send keep their zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerInfo {
    /// A2S_INFO protocol version
    pub protocol: u8,
    /// Server hostname
    pub name: String,
    /// Current map
    pub map: String,
    /// Location of server files
    pub folder: String,
    /// Name of game
    pub game: String,
    /// Steam application ID of game
    pub app_id: u16,
    /// Current players
    pub players: u8,
    /// Max players
    pub max_players: u8,
    /// Current bots
    pub bots: u8,
    pub server_type: ServerType,
    pub environment: Environment,
    /// Is the server password protected?
    pub password_protected: bool,
    /// Is the server VAC enabled?
    pub vac_enabled: bool,
    /// Version of the game installed on the server
    pub version: String,
    /// Extra data flags, telling which of the fields below were sent
    pub edf: u8,
    /// Game port number
    pub game_port: u16,
    /// Server's SteamID
    pub steam_id: u64,
    pub source_tv: SourceTv,
    /// Full 64-bit game ID
    pub game_id: u64,
}

impl ServerInfo {
    const SOURCE_MIN_LEN: usize = 20;

    const EDF_GAME_PORT: u8 = 0x80;
    const EDF_SOURCE_TV: u8 = 0x40;
    const EDF_KEYWORDS: u8 = 0x20;
    const EDF_STEAM_ID: u8 = 0x10;
    const EDF_GAME_ID: u8 = 0x01;

    /// Parse the body of a Source A2S_INFO response (type `I`).
    ///
    /// Only the fixed head and the player and server type blocks are
    /// mandatory. The app ID and every extra data field are read only when
    /// enough bytes are left for them; a truncated tail is not an error.
    pub fn from_source(data: &[u8]) -> Result<ServerInfo, SourceQueryError> {
        if data.len() < Self::SOURCE_MIN_LEN {
            return Err(SourceQueryError::ShortResponse);
        }

        let mut cur = Cursor::new(data);
        let protocol = cur.read_u8()?;
        let name = cur.read_string();
        let map = cur.read_string();
        let folder = cur.read_string();
        let game = cur.read_string();

        let app_id = if cur.remaining() >= 2 { cur.read_u16()? } else { 0 };

        if cur.remaining() < 3 {
            return Err(SourceQueryError::ShortResponse);
        }
        let players = cur.read_u8()?;
        let max_players = cur.read_u8()?;
        let bots = cur.read_u8()?;

        if cur.remaining() < 4 {
            return Err(SourceQueryError::ShortResponse);
        }
        let server_type = ServerType::from(cur.read_u8()?);
        let environment = Environment::from(cur.read_u8()?);
        let password_protected = cur.read_u8()? == 1;
        let vac_enabled = cur.read_u8()? == 1;

        let version = cur.read_string();

        let mut info = ServerInfo {
            protocol,
            name,
            map,
            folder,
            game,
            app_id,
            players,
            max_players,
            bots,
            server_type,
            environment,
            password_protected,
            vac_enabled,
            version,
            ..Default::default()
        };

        if cur.has_remaining() {
            info.edf = cur.read_u8()?;
            info.read_extra_data(&mut cur)?;
        }

        Ok(info)
    }

    fn read_extra_data(&mut self, cur: &mut Cursor) -> Result<(), SourceQueryError> {
        let edf = self.edf;

        if edf & Self::EDF_GAME_PORT != 0 && cur.remaining() >= 2 {
            self.game_port = cur.read_u16()?;
        }

        if edf & Self::EDF_STEAM_ID != 0 && cur.remaining() >= 8 {
            self.steam_id = cur.read_u64()?;
        }

        if edf & Self::EDF_SOURCE_TV != 0 && cur.remaining() >= 2 {
            self.source_tv.port = cur.read_u16()?;
            self.source_tv.name = cur.read_string();
        }

        if edf & Self::EDF_KEYWORDS != 0 {
            // tags are not kept, but the game ID comes after them
            cur.read_string();
        }

        if edf & Self::EDF_GAME_ID != 0 && cur.remaining() >= 8 {
            self.game_id = cur.read_u64()?;
        }

        Ok(())
    }

    /// Parse the body of an obsolete GoldSource A2S_INFO response (type `m`).
    ///
    /// The server address and the mod block are skipped. The bot count is
    /// optional and stays zero when the packet ends after the VAC byte.
    pub fn from_goldsource(data: &[u8]) -> Result<ServerInfo, SourceQueryError> {
        let mut cur = Cursor::new(data);

        let _address = cur.read_string();
        let name = cur.read_string();
        let map = cur.read_string();
        let folder = cur.read_string();
        let game = cur.read_string();

        if cur.remaining() < 2 {
            return Err(SourceQueryError::ShortResponse);
        }
        let players = cur.read_u8()?;
        let max_players = cur.read_u8()?;

        let protocol = cur.read_u8()?;
        let server_type = ServerType::from(cur.read_u8()?);
        let environment = Environment::from(cur.read_u8()?);
        let password_protected = cur.read_u8()? == 1;

        let is_mod = cur.read_u8()? == 1;
        if is_mod {
            let _link = cur.read_string();
            let _download_link = cur.read_string();
            // null byte, mod version (4), mod size (4), multiplayer only, custom dll
            cur.skip(1 + 4 + 4 + 1 + 1)?;
        }

        let vac_enabled = cur.read_u8()? == 1;
        let bots = if cur.has_remaining() { cur.read_u8()? } else { 0 };

        Ok(ServerInfo {
            protocol,
            name,
            map,
            folder,
            game,
            players,
            max_players,
            bots,
            server_type,
            environment,
            password_protected,
            vac_enabled,
            ..Default::default()
        })
    }
}
