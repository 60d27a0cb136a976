//! mod.rs
//!
//! Domain entities as typed structs. Each entity converts to/from the
//! store's generic `Item` via `to_item`/`from_item`, addressing individual
//! attributes rather than serializing the whole struct, so `seat_state`'s
//! conditional-write predicates can target single fields the way a
//! DynamoDB-style `UpdateExpression`/`ConditionExpression` would.

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;

use crate::store::Item;

fn req_str(item: &Item, key: &str) -> Result<String> {
    item.get_str(key).map(str::to_string).with_context(|| format!("missing attribute '{key}'"))
}

fn opt_str(item: &Item, key: &str) -> Option<String> {
    item.get_str(key).map(str::to_string)
}

fn req_i64(item: &Item, key: &str) -> Result<i64> {
    item.get(key).and_then(Value::as_i64).with_context(|| format!("missing attribute '{key}'"))
}

fn opt_i64(item: &Item, key: &str) -> Option<i64> {
    item.get(key).and_then(Value::as_i64)
}

fn req_str_vec(item: &Item, key: &str) -> Vec<String> {
    item.get(key)
        .and_then(Value::as_array)
        .map(|v| v.iter().filter_map(|x| x.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn req_decimal(item: &Item, key: &str) -> Result<Decimal> {
    let raw = req_str(item, key)?;
    Decimal::from_str(&raw).with_context(|| format!("invalid decimal in '{key}'"))
}

fn decimal_value(d: Decimal) -> Value {
    Value::String(d.to_string())
}

/// `(pk=venue_id, sk="VENUE")`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub venue_id: String,
    pub name: String,
    pub city: String,
    pub description: Option<String>,
    pub seat_types: Vec<String>,
    pub created_at: String,
}

impl Venue {
    pub fn to_item(&self) -> Item {
        let mut item = Item::new(&self.venue_id, "VENUE")
            .with("venue_id", self.venue_id.clone())
            .with("name", self.name.clone())
            .with("city", self.city.clone())
            .with("seat_types", Value::Array(self.seat_types.iter().cloned().map(Value::String).collect()))
            .with("created_at", self.created_at.clone());
        if let Some(desc) = &self.description {
            item = item.with("description", desc.clone());
        }
        item
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        Ok(Venue {
            venue_id: req_str(item, "venue_id")?,
            name: req_str(item, "name")?,
            city: req_str(item, "city")?,
            description: opt_str(item, "description"),
            seat_types: req_str_vec(item, "seat_types"),
            created_at: req_str(item, "created_at")?,
        })
    }
}

/// `(pk=venue_id, sk=seat_pos)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueSeat {
    pub venue_id: String,
    pub seat_pos: String,
    pub row: String,
    pub seat_num: String,
    pub seat_type: String,
}

impl VenueSeat {
    pub fn seat_pos(row: &str, seat_num: &str) -> String {
        format!("{row}-{seat_num}")
    }

    pub fn to_item(&self) -> Item {
        Item::new(&self.venue_id, &self.seat_pos)
            .with("venue_id", self.venue_id.clone())
            .with("seat_pos", self.seat_pos.clone())
            .with("row", self.row.clone())
            .with("seat_num", self.seat_num.clone())
            .with("seat_type", self.seat_type.clone())
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        Ok(VenueSeat {
            venue_id: item.pk.clone(),
            seat_pos: req_str(item, "seat_pos")?,
            row: req_str(item, "row")?,
            seat_num: req_str(item, "seat_num")?,
            seat_type: req_str(item, "seat_type")?,
        })
    }
}

/// `(pk=user_id, sk="USER")`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: String,
}

impl User {
    pub fn to_item(&self) -> Item {
        let mut item = Item::new(&self.user_id, "USER")
            .with("user_id", self.user_id.clone())
            .with("email", self.email.clone())
            .with("created_at", self.created_at.clone());
        if let Some(phone) = &self.phone {
            item = item.with("phone", phone.clone());
        }
        item
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        Ok(User {
            user_id: req_str(item, "user_id")?,
            email: req_str(item, "email")?,
            phone: opt_str(item, "phone"),
            created_at: req_str(item, "created_at")?,
        })
    }
}

/// `(pk=event_id, sk="EVENT")`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub venue_id: String,
    pub name: String,
    pub start_time: String,
    pub duration_minutes: i64,
    pub artists: Vec<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub seat_type_prices: HashMap<String, Decimal>,
    pub hold_attempts: i64,
    pub successful_bookings: i64,
    pub cancellations: i64,
    pub seats_sold: i64,
}

impl Event {
    pub fn to_item(&self) -> Item {
        let prices: Map<String, Value> =
            self.seat_type_prices.iter().map(|(k, v)| (k.clone(), decimal_value(*v))).collect();
        let mut item = Item::new(&self.event_id, "EVENT")
            .with("event_id", self.event_id.clone())
            .with("venue_id", self.venue_id.clone())
            .with("name", self.name.clone())
            .with("start_time", self.start_time.clone())
            .with("duration_minutes", self.duration_minutes)
            .with("artists", Value::Array(self.artists.iter().cloned().map(Value::String).collect()))
            .with("tags", Value::Array(self.tags.iter().cloned().map(Value::String).collect()))
            .with("seat_type_prices", Value::Object(prices))
            .with("hold_attempts", self.hold_attempts)
            .with("successful_bookings", self.successful_bookings)
            .with("cancellations", self.cancellations)
            .with("seats_sold", self.seats_sold);
        if let Some(desc) = &self.description {
            item = item.with("description", desc.clone());
        }
        item
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        let prices = item
            .get("seat_type_prices")
            .and_then(Value::as_object)
            .ok_or_else(|| anyhow!("missing seat_type_prices"))?;
        let mut seat_type_prices = HashMap::new();
        for (k, v) in prices {
            let raw = v.as_str().ok_or_else(|| anyhow!("price for '{k}' is not a string"))?;
            seat_type_prices.insert(k.clone(), Decimal::from_str(raw)?);
        }

        Ok(Event {
            event_id: req_str(item, "event_id")?,
            venue_id: req_str(item, "venue_id")?,
            name: req_str(item, "name")?,
            start_time: req_str(item, "start_time")?,
            duration_minutes: req_i64(item, "duration_minutes")?,
            artists: req_str_vec(item, "artists"),
            tags: req_str_vec(item, "tags"),
            description: opt_str(item, "description"),
            seat_type_prices,
            hold_attempts: opt_i64(item, "hold_attempts").unwrap_or(0),
            successful_bookings: opt_i64(item, "successful_bookings").unwrap_or(0),
            cancellations: opt_i64(item, "cancellations").unwrap_or(0),
            seats_sold: opt_i64(item, "seats_sold").unwrap_or(0),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatState {
    Available,
    Held,
    Booked,
}

impl SeatState {
    pub fn as_str(self) -> &'static str {
        match self {
            SeatState::Available => "available",
            SeatState::Held => "held",
            SeatState::Booked => "booked",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(SeatState::Available),
            "held" => Some(SeatState::Held),
            "booked" => Some(SeatState::Booked),
            _ => None,
        }
    }
}

/// `(pk=event_id, sk=seat_pos)` — the reservation unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSeat {
    pub event_id: String,
    pub seat_pos: String,
    pub row: String,
    pub seat_num: String,
    pub seat_type: String,
    pub seat_state: SeatState,
    pub booking_id: Option<String>,
    pub holding_id: Option<String>,
    pub hold_ttl: Option<i64>,
    pub price: Decimal,
    pub updated_at: Option<String>,
}

impl EventSeat {
    pub fn to_item(&self) -> Item {
        let mut item = Item::new(&self.event_id, &self.seat_pos)
            .with("event_id", self.event_id.clone())
            .with("seat_pos", self.seat_pos.clone())
            .with("row", self.row.clone())
            .with("seat_num", self.seat_num.clone())
            .with("seat_type", self.seat_type.clone())
            .with("seat_state", self.seat_state.as_str())
            .with("price", decimal_value(self.price));
        if let Some(v) = &self.booking_id {
            item = item.with("booking_id", v.clone());
        }
        if let Some(v) = &self.holding_id {
            item = item.with("holding_id", v.clone());
        }
        if let Some(v) = self.hold_ttl {
            item = item.with("hold_ttl", v);
        }
        if let Some(v) = &self.updated_at {
            item = item.with("updated_at", v.clone());
        }
        item
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        let state_str = req_str(item, "seat_state")?;
        let seat_state = SeatState::parse(&state_str).ok_or_else(|| anyhow!("invalid seat_state"))?;
        Ok(EventSeat {
            event_id: item.pk.clone(),
            seat_pos: req_str(item, "seat_pos")?,
            row: req_str(item, "row")?,
            seat_num: req_str(item, "seat_num")?,
            seat_type: req_str(item, "seat_type")?,
            seat_state,
            booking_id: opt_str(item, "booking_id"),
            holding_id: opt_str(item, "holding_id"),
            hold_ttl: opt_i64(item, "hold_ttl"),
            price: req_decimal(item, "price")?,
            updated_at: opt_str(item, "updated_at"),
        })
    }
}

/// `(pk=event_id, sk=holding_id)`, `holding_id = "holding-" + UUID`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hold {
    pub event_id: String,
    pub holding_id: String,
    pub user_id: String,
    pub seats: Vec<String>,
    pub created_at: String,
    pub expires_at: String,
    pub ttl_seconds: i64,
}

impl Hold {
    pub fn to_item(&self) -> Item {
        Item::new(&self.event_id, &self.holding_id)
            .with("event_id", self.event_id.clone())
            .with("holding_id", self.holding_id.clone())
            .with("user_id", self.user_id.clone())
            .with("seats", Value::Array(self.seats.iter().cloned().map(Value::String).collect()))
            .with("created_at", self.created_at.clone())
            .with("expires_at", self.expires_at.clone())
            .with("ttl", self.ttl_seconds)
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        Ok(Hold {
            event_id: item.pk.clone(),
            holding_id: req_str(item, "holding_id")?,
            user_id: req_str(item, "user_id")?,
            seats: req_str_vec(item, "seats"),
            created_at: req_str(item, "created_at")?,
            expires_at: req_str(item, "expires_at")?,
            ttl_seconds: req_i64(item, "ttl")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingState {
    Confirmed,
    Cancelled,
}

impl BookingState {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingState::Confirmed => "confirmed",
            BookingState::Cancelled => "cancelled",
        }
    }
}

/// `(pk=event_id, sk=booking_date)`, `booking_date` is the ISO creation
/// timestamp (Open Question in DESIGN.md: sub-millisecond sk collisions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub event_id: String,
    pub booking_id: String,
    pub booking_date: String,
    pub user_id: String,
    pub seats: Vec<String>,
    pub state: BookingState,
    pub payment_status: String,
    pub cancelled_at: Option<String>,
}

impl Booking {
    pub fn to_item(&self) -> Item {
        let mut item = Item::new(&self.event_id, &self.booking_date)
            .with("event_id", self.event_id.clone())
            .with("booking_id", self.booking_id.clone())
            .with("booking_date", self.booking_date.clone())
            .with("user_id", self.user_id.clone())
            .with("seats", Value::Array(self.seats.iter().cloned().map(Value::String).collect()))
            .with("state", self.state.as_str())
            .with("payment_status", self.payment_status.clone());
        if let Some(v) = &self.cancelled_at {
            item = item.with("cancelled_at", v.clone());
        }
        item
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        let state_str = req_str(item, "state")?;
        let state = match state_str.as_str() {
            "confirmed" => BookingState::Confirmed,
            "cancelled" => BookingState::Cancelled,
            _ => return Err(anyhow!("invalid booking state '{state_str}'")),
        };
        Ok(Booking {
            event_id: item.pk.clone(),
            booking_id: req_str(item, "booking_id")?,
            booking_date: req_str(item, "booking_date")?,
            user_id: req_str(item, "user_id")?,
            seats: req_str_vec(item, "seats"),
            state,
            payment_status: req_str(item, "payment_status")?,
            cancelled_at: opt_str(item, "cancelled_at"),
        })
    }
}
