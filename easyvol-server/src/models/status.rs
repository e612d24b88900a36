//! Status vocabularies
//!
//! The registries carry Italian wire values (`attivo`,
//! `carico`, `padre`, ...). Columns store the wire string; parsing happens
//! at the request boundary so invalid values become 400s, not 500s.

use super::ValidationError;

macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident, $field:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( #[serde(rename = $wire)] $variant, )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self { $( Self::$variant => $wire, )+ }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok(Self::$variant), )+
                    other => Err(ValidationError::InvalidVariant {
                        field: $field,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

status_enum!(
    /// Member lifecycle status
    MemberStatus, "member status", {
        Attivo => "attivo",
        Sospeso => "sospeso",
        Dimesso => "dimesso",
    }
);

status_enum!(
    /// Vehicle operational status
    VehicleStatus, "vehicle status", {
        Operativo => "operativo",
        Manutenzione => "manutenzione",
        FuoriServizio => "fuori_servizio",
    }
);

status_enum!(
    /// Radio fleet status
    RadioStatus, "radio status", {
        Disponibile => "disponibile",
        Assegnata => "assegnata",
        Manutenzione => "manutenzione",
    }
);

status_enum!(
    /// Warehouse ledger entry type
    MovementType, "movement type", {
        Carico => "carico",
        Scarico => "scarico",
        Assegnazione => "assegnazione",
        Restituzione => "restituzione",
    }
);

impl MovementType {
    /// Whether this movement increases the item quantity.
    pub fn is_inbound(&self) -> bool {
        matches!(self, Self::Carico | Self::Restituzione)
    }

    /// Signed quantity delta for a movement of `quantity` units.
    pub fn delta(&self, quantity: i64) -> i64 {
        if self.is_inbound() {
            quantity
        } else {
            -quantity
        }
    }
}

status_enum!(
    /// Deadline state in the scheduler
    SchedulerStatus, "scheduler status", {
        Pending => "pending",
        Completed => "completed",
        Overdue => "overdue",
    }
);

status_enum!(
    /// Meeting participant attendance
    Attendance, "attendance", {
        Presente => "presente",
        Assente => "assente",
        Giustificato => "giustificato",
    }
);

status_enum!(
    /// Guardian relationship for junior members
    GuardianType, "guardian type", {
        Padre => "padre",
        Madre => "madre",
        Tutore => "tutore",
    }
);

status_enum!(
    /// Event lifecycle
    EventStatus, "event status", {
        Aperto => "aperto",
        InCorso => "in_corso",
        Concluso => "concluso",
        Annullato => "annullato",
    }
);

status_enum!(
    /// Event category
    EventType, "event type", {
        Emergenza => "emergenza",
        Esercitazione => "esercitazione",
        Attivita => "attivita",
    }
);

status_enum!(
    /// Membership fee payment request state
    FeeRequestStatus, "fee request status", {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
);

status_enum!(
    /// Print template shape: one record or a filtered list
    TemplateKind, "template kind", {
        Single => "single",
        List => "list",
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip() {
        assert_eq!("attivo".parse::<MemberStatus>().unwrap(), MemberStatus::Attivo);
        assert_eq!(MemberStatus::Dimesso.as_str(), "dimesso");
        assert_eq!(
            "fuori_servizio".parse::<VehicleStatus>().unwrap(),
            VehicleStatus::FuoriServizio
        );
    }

    #[test]
    fn unknown_value_is_invalid_variant() {
        let err = "archiviato".parse::<MemberStatus>().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidVariant { field: "member status", .. }));
    }

    #[test]
    fn movement_deltas() {
        assert_eq!(MovementType::Carico.delta(5), 5);
        assert_eq!(MovementType::Restituzione.delta(2), 2);
        assert_eq!(MovementType::Scarico.delta(5), -5);
        assert_eq!(MovementType::Assegnazione.delta(1), -1);
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&VehicleStatus::FuoriServizio).unwrap();
        assert_eq!(json, "\"fuori_servizio\"");
        let parsed: Attendance = serde_json::from_str("\"giustificato\"").unwrap();
        assert_eq!(parsed, Attendance::Giustificato);
    }
}
