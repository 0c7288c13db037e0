#![no_std]
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, token, Address, Env,
    Vec,
};

use boost_shared::{lock_weight, validate_lock_duration, validate_positive_amount};

mod test;

// Data Types

/// One time-locked governance position. Immutable once created except for
/// the `redeemed` flag, which flips true exactly once.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LockPosition {
    pub principal: i128,
    pub duration: u64,
    pub created_at: u64,
    pub unlock_at: u64,
    pub weight: i128,
    pub redeemed: bool,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EscrowConfig {
    pub token: Address,
}

// Storage Keys
#[contracttype]
pub enum DataKey {
    Config,
    LockCount(Address),
    Lock(Address, u32),
    Underlying(Address),
    Weight(Address),
    TotalUnderlying,
    TotalWeight,
}

// Error Types
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum EscrowError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    ZeroAmount = 3,
    InvalidDuration = 4,
    InsufficientFunds = 5,
    LockNotFound = 6,
    LockNotExpired = 7,
    AlreadyRedeemed = 8,
}

// Events
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LockEvent {
    pub owner: Address,
    pub principal: i128,
    pub duration: u64,
    pub unlock_at: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RedeemEvent {
    pub owner: Address,
    pub principal: i128,
}

#[contract]
pub struct VoteEscrowLedger;

#[contractimpl]
impl VoteEscrowLedger {
    /// Initialize the ledger with the governance-backing token it custodies
    pub fn initialize(env: Env, token: Address) -> Result<(), EscrowError> {
        if env.storage().instance().has(&DataKey::Config) {
            return Err(EscrowError::AlreadyInitialized);
        }

        env.storage()
            .instance()
            .set(&DataKey::Config, &EscrowConfig { token });
        env.storage().instance().set(&DataKey::TotalUnderlying, &0i128);
        env.storage().instance().set(&DataKey::TotalWeight, &0i128);

        Ok(())
    }

    /// Lock `principal` of the governance token for `duration` seconds.
    /// Returns the index of the created position.
    pub fn lock(
        env: Env,
        caller: Address,
        principal: i128,
        duration: u64,
    ) -> Result<u32, EscrowError> {
        caller.require_auth();
        Self::create_lock(&env, &caller, principal, duration, &caller)
    }

    /// Same as `lock`, but the position is credited to `beneficiary` while
    /// funds are pulled from `funder`. The amplifier delivers rewards
    /// through this path with itself as the funder.
    pub fn lock_to(
        env: Env,
        funder: Address,
        principal: i128,
        duration: u64,
        beneficiary: Address,
    ) -> Result<u32, EscrowError> {
        funder.require_auth();
        Self::create_lock(&env, &funder, principal, duration, &beneficiary)
    }

    /// Redeem expired positions by index, all-or-nothing: any invalid id
    /// rejects the whole call (the host rolls back on error, so a failed
    /// batch leaves every position untouched). Returns the total principal
    /// transferred back to the caller.
    pub fn redeem(env: Env, caller: Address, ids: Vec<u32>) -> Result<i128, EscrowError> {
        caller.require_auth();

        let config = Self::config(&env)?;
        let now = env.ledger().timestamp();

        let mut total_principal = 0i128;
        let mut total_weight = 0i128;

        for id in ids.iter() {
            let mut position: LockPosition = env
                .storage()
                .persistent()
                .get(&DataKey::Lock(caller.clone(), id))
                .ok_or(EscrowError::LockNotFound)?;

            if position.redeemed {
                return Err(EscrowError::AlreadyRedeemed);
            }
            if now < position.unlock_at {
                return Err(EscrowError::LockNotExpired);
            }

            position.redeemed = true;
            env.storage()
                .persistent()
                .set(&DataKey::Lock(caller.clone(), id), &position);

            total_principal += position.principal;
            total_weight += position.weight;

            env.events().publish(
                (symbol_short!("redeem"), caller.clone()),
                RedeemEvent {
                    owner: caller.clone(),
                    principal: position.principal,
                },
            );
        }

        Self::adjust_aggregates(&env, &caller, -total_principal, -total_weight);

        if total_principal > 0 {
            token::Client::new(&env, &config.token).transfer(
                &env.current_contract_address(),
                &caller,
                &total_principal,
            );
        }

        log!(&env, "redeemed {} for {}", total_principal, caller);

        Ok(total_principal)
    }

    // Getters

    /// Sum of principal across the account's non-redeemed positions
    pub fn get_underlying_tokens(env: Env, account: Address) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::Underlying(account))
            .unwrap_or(0)
    }

    /// Voting weight: sum of `weight` across non-redeemed positions
    pub fn balance_of(env: Env, account: Address) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::Weight(account))
            .unwrap_or(0)
    }

    pub fn get_lock_count(env: Env, account: Address) -> u32 {
        env.storage()
            .persistent()
            .get(&DataKey::LockCount(account))
            .unwrap_or(0)
    }

    pub fn get_lock(env: Env, account: Address, id: u32) -> Option<LockPosition> {
        env.storage().persistent().get(&DataKey::Lock(account, id))
    }

    pub fn total_underlying(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::TotalUnderlying)
            .unwrap_or(0)
    }

    pub fn total_weight(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&DataKey::TotalWeight)
            .unwrap_or(0)
    }

    pub fn get_config(env: Env) -> Result<EscrowConfig, EscrowError> {
        Self::config(&env)
    }

    // Internal helpers

    fn config(env: &Env) -> Result<EscrowConfig, EscrowError> {
        env.storage()
            .instance()
            .get(&DataKey::Config)
            .ok_or(EscrowError::NotInitialized)
    }

    fn create_lock(
        env: &Env,
        funder: &Address,
        principal: i128,
        duration: u64,
        owner: &Address,
    ) -> Result<u32, EscrowError> {
        let config = Self::config(env)?;

        if !validate_positive_amount(principal) {
            return Err(EscrowError::ZeroAmount);
        }
        if !validate_lock_duration(duration) {
            return Err(EscrowError::InvalidDuration);
        }

        let client = token::Client::new(env, &config.token);
        if client.balance(funder) < principal {
            return Err(EscrowError::InsufficientFunds);
        }
        client.transfer_from(
            &env.current_contract_address(),
            funder,
            &env.current_contract_address(),
            &principal,
        );

        let now = env.ledger().timestamp();
        let weight = lock_weight(principal, duration);
        let position = LockPosition {
            principal,
            duration,
            created_at: now,
            unlock_at: now + duration,
            weight,
            redeemed: false,
        };

        let index: u32 = env
            .storage()
            .persistent()
            .get(&DataKey::LockCount(owner.clone()))
            .unwrap_or(0);
        env.storage()
            .persistent()
            .set(&DataKey::Lock(owner.clone(), index), &position);
        env.storage()
            .persistent()
            .set(&DataKey::LockCount(owner.clone()), &(index + 1));

        Self::adjust_aggregates(env, owner, principal, weight);

        env.events().publish(
            (symbol_short!("lock"), owner.clone()),
            LockEvent {
                owner: owner.clone(),
                principal,
                duration,
                unlock_at: position.unlock_at,
            },
        );

        log!(&env, "locked {} for {} seconds", principal, duration);

        Ok(index)
    }

    fn adjust_aggregates(env: &Env, account: &Address, principal_delta: i128, weight_delta: i128) {
        let underlying: i128 = env
            .storage()
            .persistent()
            .get(&DataKey::Underlying(account.clone()))
            .unwrap_or(0);
        env.storage().persistent().set(
            &DataKey::Underlying(account.clone()),
            &(underlying + principal_delta),
        );

        let weight: i128 = env
            .storage()
            .persistent()
            .get(&DataKey::Weight(account.clone()))
            .unwrap_or(0);
        env.storage()
            .persistent()
            .set(&DataKey::Weight(account.clone()), &(weight + weight_delta));

        let total_underlying: i128 = env
            .storage()
            .instance()
            .get(&DataKey::TotalUnderlying)
            .unwrap_or(0);
        env.storage().instance().set(
            &DataKey::TotalUnderlying,
            &(total_underlying + principal_delta),
        );

        let total_weight: i128 = env
            .storage()
            .instance()
            .get(&DataKey::TotalWeight)
            .unwrap_or(0);
        env.storage()
            .instance()
            .set(&DataKey::TotalWeight, &(total_weight + weight_delta));
    }
}
