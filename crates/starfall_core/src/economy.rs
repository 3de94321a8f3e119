//! Faction markets and trading.
//!
//! Each faction runs one market of sell offers. Prices and demand
//! modifiers are fixed-point so fluctuations replay bit-identically.
//! Trades are paid in whole credits, rounding the total up.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::Item;
use crate::error::{GameError, Result};
use crate::factions::{Faction, FactionId};
use crate::math::{fixed_map_serde, fixed_serde, Fixed};
use crate::rng::RandomSource;

/// Largest price swing per fluctuation, in per-mille of a tenth.
///
/// A roll of `u` in `[-500, 500]` scales prices by `1 + u / 10_000`, so
/// each pass moves a price by at most five percent.
pub const FLUCTUATION_SPREAD: i64 = 500;

/// Demand added per unit listed.
#[must_use]
pub fn demand_factor() -> Fixed {
    Fixed::from_num(5) / Fixed::from_num(100)
}

/// An item a faction offers for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffer {
    /// Item for sale.
    pub item: String,
    /// Units available.
    pub quantity: u32,
    /// Credits per unit.
    #[serde(with = "fixed_serde")]
    pub price_per_unit: Fixed,
}

/// One faction's market.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Market {
    /// Open sell offers.
    pub offers: Vec<TradeOffer>,
    /// Accumulated demand per item.
    #[serde(with = "fixed_map_serde")]
    pub demand_modifiers: BTreeMap<String, Fixed>,
}

impl Market {
    /// The offer for an item, if listed.
    #[must_use]
    pub fn offer(&self, item: &str) -> Option<&TradeOffer> {
        self.offers.iter().find(|o| o.item == item)
    }

    /// Demand accumulated for an item.
    #[must_use]
    pub fn demand(&self, item: &str) -> Fixed {
        self.demand_modifiers.get(item).copied().unwrap_or(Fixed::ZERO)
    }
}

/// A completed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeReceipt {
    /// Buying faction.
    pub buyer: FactionId,
    /// Selling faction.
    pub seller: FactionId,
    /// Item traded.
    pub item: String,
    /// Units traded.
    pub quantity: u32,
    /// Credits paid.
    pub total_cost: u64,
}

/// Total cost of `quantity` units, rounded up to whole credits.
#[must_use]
pub fn trade_cost(price_per_unit: Fixed, quantity: u32) -> Option<u64> {
    let quantity = Fixed::checked_from_num(quantity)?;
    price_per_unit
        .checked_mul(quantity)?
        .checked_ceil()?
        .checked_to_num::<u64>()
}

/// Every faction's market.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EconomySystem {
    markets: BTreeMap<FactionId, Market>,
}

impl EconomySystem {
    /// Create an economy with no markets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a market for a faction. Does nothing if one is open.
    pub fn open_market(&mut self, faction: FactionId) {
        self.markets.entry(faction).or_default();
    }

    /// Close a faction's market, discarding its offers.
    pub fn close_market(&mut self, faction: FactionId) -> Option<Market> {
        self.markets.remove(&faction)
    }

    /// Look up a market.
    pub fn market(&self, faction: FactionId) -> Result<&Market> {
        self.markets
            .get(&faction)
            .ok_or(GameError::MarketNotFound(faction))
    }

    /// Iterate over markets in faction order.
    pub fn markets(&self) -> impl Iterator<Item = (&FactionId, &Market)> {
        self.markets.iter()
    }

    /// List units for sale.
    ///
    /// Merges into an existing offer for the item, replacing its price.
    /// Demand for the item rises by `quantity * 0.05`.
    pub fn update_market(
        &mut self,
        faction: FactionId,
        item: &str,
        quantity: u32,
        price_per_unit: Fixed,
    ) -> Result<()> {
        if price_per_unit < Fixed::ZERO {
            return Err(GameError::InvalidTarget(format!(
                "negative price {price_per_unit} for {item}"
            )));
        }
        let market = self
            .markets
            .get_mut(&faction)
            .ok_or(GameError::MarketNotFound(faction))?;

        match market.offers.iter_mut().find(|o| o.item == item) {
            Some(offer) => {
                offer.quantity = offer.quantity.saturating_add(quantity);
                offer.price_per_unit = price_per_unit;
            }
            None => market.offers.push(TradeOffer {
                item: item.to_string(),
                quantity,
                price_per_unit,
            }),
        }

        let change = Fixed::saturating_from_num(quantity).saturating_mul(demand_factor());
        let demand = market.demand_modifiers.entry(item.to_string()).or_insert(Fixed::ZERO);
        *demand = demand.saturating_add(change);

        tracing::debug!(faction = %faction, item, quantity, price = %price_per_unit, "Market updated");
        Ok(())
    }

    /// Buy units from another faction's market at the listed price.
    ///
    /// Checks run before anything is mutated. The bought units land in the
    /// buyer's stockpile; emptied offers are removed.
    pub fn execute_trade(
        &mut self,
        buyer: &mut Faction,
        seller: &mut Faction,
        item: &str,
        quantity: u32,
    ) -> Result<TradeReceipt> {
        if quantity == 0 {
            return Err(GameError::InvalidTarget(format!("cannot trade zero {item}")));
        }
        if buyer.id == seller.id {
            return Err(GameError::InvalidTarget(format!(
                "faction {} cannot trade with itself",
                buyer.id
            )));
        }
        let market = self
            .markets
            .get_mut(&seller.id)
            .ok_or(GameError::MarketNotFound(seller.id))?;

        let unavailable = || GameError::OfferUnavailable {
            item: item.to_string(),
            quantity,
        };
        let offer_index = market
            .offers
            .iter()
            .position(|o| o.item == item && o.quantity >= quantity)
            .ok_or_else(unavailable)?;
        let offer = &mut market.offers[offer_index];

        let total_cost = trade_cost(offer.price_per_unit, quantity).unwrap_or(u64::MAX);
        if buyer.credits < total_cost {
            return Err(GameError::InsufficientCredits {
                required: total_cost,
                available: buyer.credits,
            });
        }

        offer.quantity -= quantity;
        if offer.quantity == 0 {
            market.offers.remove(offer_index);
        }
        buyer.credits -= total_cost;
        seller.credits = seller.credits.saturating_add(total_cost);
        buyer.stockpile.add(Item::new(item, quantity));

        tracing::info!(buyer = %buyer.id, seller = %seller.id, item, quantity, total_cost, "Trade executed");
        Ok(TradeReceipt {
            buyer: buyer.id,
            seller: seller.id,
            item: item.to_string(),
            quantity,
            total_cost,
        })
    }

    /// Nudge every listed price by up to five percent either way.
    pub fn simulate_market_fluctuations(&mut self, rng: &mut dyn RandomSource) {
        let scale = Fixed::from_num(10_000);
        for market in self.markets.values_mut() {
            for offer in &mut market.offers {
                let roll = rng.next_in_range(-FLUCTUATION_SPREAD, FLUCTUATION_SPREAD + 1);
                let factor = Fixed::ONE + Fixed::saturating_from_num(roll) / scale;
                offer.price_per_unit = offer.price_per_unit.saturating_mul(factor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{ScriptedRandom, SeededRandom};

    fn faction(id: u32, credits: u64) -> Faction {
        let mut faction = Faction::new(FactionId(id), format!("Faction {id}"));
        faction.credits = credits;
        faction
    }

    fn price(credits: i32) -> Fixed {
        Fixed::from_num(credits)
    }

    #[test]
    fn test_update_market_merges_offers() {
        let mut economy = EconomySystem::new();
        let id = FactionId(1000);
        economy.open_market(id);

        economy.update_market(id, "ore", 10, price(5)).unwrap();
        economy.update_market(id, "ore", 10, price(7)).unwrap();

        let market = economy.market(id).unwrap();
        assert_eq!(market.offers.len(), 1);
        assert_eq!(market.offers[0].quantity, 20);
        assert_eq!(market.offers[0].price_per_unit, price(7));
        let epsilon = Fixed::ONE / Fixed::from_num(1000);
        assert!((market.demand("ore") - Fixed::ONE).abs() < epsilon);
    }

    #[test]
    fn test_update_missing_market() {
        let mut economy = EconomySystem::new();
        assert_eq!(
            economy.update_market(FactionId(5), "ore", 1, price(1)),
            Err(GameError::MarketNotFound(FactionId(5)))
        );
    }

    #[test]
    fn test_trade_moves_credits_and_goods() {
        let mut economy = EconomySystem::new();
        let mut buyer = faction(1000, 100);
        let mut seller = faction(1001, 0);
        economy.open_market(seller.id);
        economy.update_market(seller.id, "ore", 10, price(3)).unwrap();

        let receipt = economy.execute_trade(&mut buyer, &mut seller, "ore", 4).unwrap();

        assert_eq!(receipt.total_cost, 12);
        assert_eq!(buyer.credits, 88);
        assert_eq!(seller.credits, 12);
        assert_eq!(buyer.stockpile.quantity_of("ore"), 4);
        assert_eq!(economy.market(seller.id).unwrap().offer("ore").unwrap().quantity, 6);
    }

    #[test]
    fn test_trade_rounds_cost_up() {
        assert_eq!(trade_cost(Fixed::from_num(2.5), 3), Some(8));
        assert_eq!(trade_cost(Fixed::from_num(2), 3), Some(6));
    }

    #[test]
    fn test_trade_failures_leave_state() {
        let mut economy = EconomySystem::new();
        let mut buyer = faction(1000, 5);
        let mut seller = faction(1001, 0);
        economy.open_market(seller.id);
        economy.update_market(seller.id, "ore", 2, price(3)).unwrap();

        assert_eq!(
            economy.execute_trade(&mut buyer, &mut seller, "ore", 3),
            Err(GameError::OfferUnavailable {
                item: "ore".into(),
                quantity: 3
            })
        );
        assert_eq!(
            economy.execute_trade(&mut buyer, &mut seller, "ore", 2),
            Err(GameError::InsufficientCredits {
                required: 6,
                available: 5
            })
        );
        assert_eq!(buyer.credits, 5);
        assert_eq!(economy.market(seller.id).unwrap().offer("ore").unwrap().quantity, 2);
    }

    #[test]
    fn test_emptied_offer_removed() {
        let mut economy = EconomySystem::new();
        let mut buyer = faction(1000, 50);
        let mut seller = faction(1001, 0);
        economy.open_market(seller.id);
        economy.update_market(seller.id, "ore", 2, price(3)).unwrap();

        economy.execute_trade(&mut buyer, &mut seller, "ore", 2).unwrap();
        assert!(economy.market(seller.id).unwrap().offer("ore").is_none());
    }

    #[test]
    fn test_zero_quantity_trade_rejected() {
        let mut economy = EconomySystem::new();
        let mut buyer = faction(1000, 50);
        let mut seller = faction(1001, 0);
        economy.open_market(seller.id);
        economy.update_market(seller.id, "ore", 2, price(3)).unwrap();

        let result = economy.execute_trade(&mut buyer, &mut seller, "ore", 0);
        assert!(matches!(result, Err(GameError::InvalidTarget(_))));
        assert_eq!(buyer.stockpile.quantity_of("ore"), 0);
        assert_eq!(buyer.credits, 50);
        assert_eq!(economy.market(seller.id).unwrap().offer("ore").unwrap().quantity, 2);
    }

    #[test]
    fn test_fluctuations_bounded() {
        let mut economy = EconomySystem::new();
        let id = FactionId(1000);
        economy.open_market(id);
        economy.update_market(id, "ore", 1, price(100)).unwrap();

        let mut high = ScriptedRandom::new([FLUCTUATION_SPREAD]);
        economy.simulate_market_fluctuations(&mut high);
        let raised = economy.market(id).unwrap().offers[0].price_per_unit;
        assert!((raised - price(105)).abs() < Fixed::ONE / Fixed::from_num(1000));

        let mut rng = SeededRandom::new(9);
        for _ in 0..20 {
            let before = economy.market(id).unwrap().offers[0].price_per_unit;
            economy.simulate_market_fluctuations(&mut rng);
            let after = economy.market(id).unwrap().offers[0].price_per_unit;
            assert!(after >= before * Fixed::from_num(0.94));
            assert!(after <= before * Fixed::from_num(1.06));
        }
    }
}
