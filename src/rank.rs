use std::fmt;
use std::str::FromStr;

/// Belt ladder, lowest to highest. `Branca` is the entry rank and never a
/// valid examination target; dan grades carry a stage between 1 and 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rank {
    Branca,
    Amarela,
    Laranja,
    Verde,
    Azul,
    Roxa,
    Marrom,
    Preta,
    Dan(u8),
}

pub const MAX_DAN_STAGE: u8 = 10;

/// Raised when a rank token is not part of the closed ladder. This is the
/// only place an invalid rank can exist; every `Rank` value past the parse
/// boundary is valid by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRankError(pub String);

impl fmt::Display for InvalidRankError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unrecognized rank '{}' (expected one of branca, amarela, laranja, verde, azul, roxa, marrom, preta, dan1-dan{})",
            self.0, MAX_DAN_STAGE
        )
    }
}

impl std::error::Error for InvalidRankError {}

impl Rank {
    /// Position on the ladder; dan grades continue past preta by stage.
    pub fn ladder_index(self) -> u8 {
        match self {
            Rank::Branca => 0,
            Rank::Amarela => 1,
            Rank::Laranja => 2,
            Rank::Verde => 3,
            Rank::Azul => 4,
            Rank::Roxa => 5,
            Rank::Marrom => 6,
            Rank::Preta => 7,
            Rank::Dan(stage) => 7 + stage,
        }
    }

    pub fn stage(self) -> Option<u8> {
        match self {
            Rank::Dan(stage) => Some(stage),
            _ => None,
        }
    }

    /// Branca is held, never examined for.
    pub fn is_promotable(self) -> bool {
        self != Rank::Branca
    }

    /// Next ladder step, `None` at dan10.
    pub fn successor(self) -> Option<Rank> {
        match self {
            Rank::Branca => Some(Rank::Amarela),
            Rank::Amarela => Some(Rank::Laranja),
            Rank::Laranja => Some(Rank::Verde),
            Rank::Verde => Some(Rank::Azul),
            Rank::Azul => Some(Rank::Roxa),
            Rank::Roxa => Some(Rank::Marrom),
            Rank::Marrom => Some(Rank::Preta),
            Rank::Preta => Some(Rank::Dan(1)),
            Rank::Dan(stage) if stage < MAX_DAN_STAGE => Some(Rank::Dan(stage + 1)),
            Rank::Dan(_) => None,
        }
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ladder_index().cmp(&other.ladder_index())
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Branca => write!(f, "branca"),
            Rank::Amarela => write!(f, "amarela"),
            Rank::Laranja => write!(f, "laranja"),
            Rank::Verde => write!(f, "verde"),
            Rank::Azul => write!(f, "azul"),
            Rank::Roxa => write!(f, "roxa"),
            Rank::Marrom => write!(f, "marrom"),
            Rank::Preta => write!(f, "preta"),
            Rank::Dan(stage) => write!(f, "dan{stage}"),
        }
    }
}

impl FromStr for Rank {
    type Err = InvalidRankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        if let Some(stage_str) = token.strip_prefix("dan") {
            let stage: u8 = stage_str
                .parse()
                .map_err(|_| InvalidRankError(s.to_string()))?;
            if (1..=MAX_DAN_STAGE).contains(&stage) {
                return Ok(Rank::Dan(stage));
            }
            return Err(InvalidRankError(s.to_string()));
        }
        match token.as_str() {
            "branca" => Ok(Rank::Branca),
            "amarela" => Ok(Rank::Amarela),
            "laranja" => Ok(Rank::Laranja),
            "verde" => Ok(Rank::Verde),
            "azul" => Ok(Rank::Azul),
            "roxa" => Ok(Rank::Roxa),
            "marrom" => Ok(Rank::Marrom),
            "preta" => Ok(Rank::Preta),
            _ => Err(InvalidRankError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_tokens() {
        assert_eq!("amarela".parse::<Rank>().unwrap(), Rank::Amarela);
        assert_eq!("Marrom".parse::<Rank>().unwrap(), Rank::Marrom);
        assert_eq!(" preta ".parse::<Rank>().unwrap(), Rank::Preta);
        assert_eq!("dan3".parse::<Rank>().unwrap(), Rank::Dan(3));
    }

    #[test]
    fn rejects_unknown_tokens() {
        assert!("verde-claro".parse::<Rank>().is_err());
        assert!("dan0".parse::<Rank>().is_err());
        assert!("dan11".parse::<Rank>().is_err());
        assert!("dan".parse::<Rank>().is_err());
        assert!("".parse::<Rank>().is_err());
    }

    #[test]
    fn display_round_trips() {
        let ranks = [
            Rank::Branca,
            Rank::Amarela,
            Rank::Roxa,
            Rank::Preta,
            Rank::Dan(7),
        ];
        for rank in ranks {
            assert_eq!(rank.to_string().parse::<Rank>().unwrap(), rank);
        }
    }

    #[test]
    fn ladder_is_totally_ordered() {
        assert!(Rank::Branca < Rank::Amarela);
        assert!(Rank::Amarela < Rank::Marrom);
        assert!(Rank::Marrom < Rank::Preta);
        assert!(Rank::Preta < Rank::Dan(1));
        assert!(Rank::Dan(1) < Rank::Dan(2));
    }

    #[test]
    fn successor_walks_the_ladder() {
        assert_eq!(Rank::Branca.successor(), Some(Rank::Amarela));
        assert_eq!(Rank::Marrom.successor(), Some(Rank::Preta));
        assert_eq!(Rank::Preta.successor(), Some(Rank::Dan(1)));
        assert_eq!(Rank::Dan(10).successor(), None);
    }

    #[test]
    fn only_branca_is_unpromotable() {
        assert!(!Rank::Branca.is_promotable());
        assert!(Rank::Amarela.is_promotable());
        assert!(Rank::Dan(5).is_promotable());
    }

    #[test]
    fn stage_only_on_dan_grades() {
        assert_eq!(Rank::Preta.stage(), None);
        assert_eq!(Rank::Dan(4).stage(), Some(4));
    }
}
