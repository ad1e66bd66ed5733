use crate::error::SourceQueryError;
use crate::parse::Cursor;

/// A connected player as obtained by [crate::query::Client::players].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerInfo {
    /// Slot index. Not a stable player ID, servers commonly send 0 for everyone.
    pub index: u8,
    /// Player name
    pub name: String,
    /// Player score (usually "frags" or "kills")
    pub score: i32,
    /// Time in seconds the player has been connected
    pub duration: f32,
    /// Never sent by A2S_PLAYER; only some game-specific variants carry it.
    pub deaths: i32,
    /// Never sent by A2S_PLAYER; only some game-specific variants carry it.
    pub money: i32,
}

impl PlayerInfo {
    /// Parse the body of an A2S_PLAYER response.
    ///
    /// Reads at most as many players as the count byte announces, and stops
    /// early if the packet runs out first.
    pub fn parse_list(data: &[u8]) -> Result<Vec<PlayerInfo>, SourceQueryError> {
        let mut cur = Cursor::new(data);
        let count = cur.read_u8()?;

        let mut players = Vec::with_capacity(count as usize);
        while players.len() < count as usize && cur.has_remaining() {
            let index = cur.read_u8()?;
            let name = cur.read_string();
            let score = cur.read_i32()?;
            let duration = cur.read_f32()?;

            players.push(PlayerInfo {
                index,
                name,
                score,
                duration,
                ..Default::default()
            });
        }

        Ok(players)
    }
}

/// A server rule (cvar) as obtained by [crate::query::Client::rules].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub value: String,
}

impl Rule {
    /// Parse the body of an A2S_RULES response, keeping the server's order.
    pub fn parse_list(data: &[u8]) -> Result<Vec<Rule>, SourceQueryError> {
        let mut cur = Cursor::new(data);
        let count = cur.read_u16()?;

        let mut rules = Vec::with_capacity(count as usize);
        while rules.len() < count as usize && cur.has_remaining() {
            let name = cur.read_string();
            let value = cur.read_string();
            rules.push(Rule { name, value });
        }

        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(data: &mut Vec<u8>, name: &str, score: i32, duration: f32) {
        data.push(0);
        data.extend_from_slice(name.as_bytes());
        data.push(0);
        data.extend_from_slice(&score.to_le_bytes());
        data.extend_from_slice(&duration.to_le_bytes());
    }

    #[test]
    fn test_parse_players() {
        let mut data = vec![2];
        player(&mut data, "alice", 12, 300.5);
        player(&mut data, "bob", -3, 12.0);

        let players = PlayerInfo::parse_list(&data).unwrap();

        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "alice");
        assert_eq!(players[0].score, 12);
        assert_eq!(players[0].duration, 300.5);
        assert_eq!(players[1].name, "bob");
        assert_eq!(players[1].score, -3);
        assert_eq!(players[1].deaths, 0);
        assert_eq!(players[1].money, 0);
    }

    #[test]
    fn test_parse_players_stops_at_count() {
        let mut data = vec![1];
        player(&mut data, "alice", 1, 1.0);
        player(&mut data, "bob", 2, 2.0);

        let players = PlayerInfo::parse_list(&data).unwrap();

        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "alice");
    }

    #[test]
    fn test_parse_players_stops_when_exhausted() {
        let mut data = vec![5];
        player(&mut data, "alice", 1, 1.0);

        let players = PlayerInfo::parse_list(&data).unwrap();

        assert_eq!(players.len(), 1);
    }

    #[test]
    fn test_parse_players_truncated_entry() {
        let mut data = vec![1];
        player(&mut data, "alice", 1, 1.0);
        data.truncate(data.len() - 2);

        assert!(matches!(
            PlayerInfo::parse_list(&data),
            Err(SourceQueryError::ShortResponse)
        ));
        assert!(matches!(
            PlayerInfo::parse_list(&[]),
            Err(SourceQueryError::ShortResponse)
        ));
    }

    #[test]
    fn test_parse_rules() {
        let data = b"\x02\x00mode\0ctf\0ffa\00\0";

        let rules = Rule::parse_list(data).unwrap();

        assert_eq!(
            rules,
            vec![
                Rule {
                    name: "mode".to_owned(),
                    value: "ctf".to_owned()
                },
                Rule {
                    name: "ffa".to_owned(),
                    value: "0".to_owned()
                },
            ]
        );
    }

    #[test]
    fn test_parse_rules_stops_when_exhausted() {
        let rules = Rule::parse_list(b"\x0A\x00sv_cheats\x000\0").unwrap();

        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].value, "0");
        assert!(Rule::parse_list(&[0, 0, b'x', 0]).unwrap().is_empty());
        assert!(matches!(
            Rule::parse_list(&[1]),
            Err(SourceQueryError::ShortResponse)
        ));
    }
}
