#![no_std]
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, token, Address, Env,
};

use boost_escrow::VoteEscrowLedgerClient;
use boost_shared::{
    exit_fee, validate_lock_duration, validate_positive_amount, MAX_BASIS_POINTS, SHARE_PRECISION,
};


// Data Types

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AmplifierConfig {
    pub owner: Address,
    pub lp_token: Address,
    pub reward_token: Address,
    pub escrow: Address,
    /// Maximum reward divisor in basis points (20000 = 2.0x boost range)
    pub multiplier_max: i128,
    /// Duration of the escrow lock created when a reward is delivered
    pub reward_lock_duration: u64,
}

/// One funded reward epoch. `first_stake_time` is 0 until the first stake.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Deposit {
    pub total_rewards: i128,
    pub start_time: u64,
    pub end_time: u64,
    pub reward_per_second: i128,
    pub total_stake: i128,
    pub total_stakers: u32,
    pub first_stake_time: u64,
    pub acc_reward_per_share: i128,
    pub last_accrual_time: u64,
    pub total_claimed_rewards: i128,
    pub total_reclaimed: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakerPosition {
    pub amount: i128,
    /// Accumulator value last settled against this stake
    pub reward_debt: i128,
    pub claimed_rewards: i128,
}

// Storage Keys
#[contracttype]
pub enum DataKey {
    Config,
    Deposit,
    Staker(Address),
}

// Error Types
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum AmplifierError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    InvalidConfiguration = 4,
    InvalidWindow = 5,
    ZeroAmount = 6,
    NotStarted = 7,
    EpochOver = 8,
    TransferFailed = 9,
    NothingStaked = 10,
    InvalidDuration = 11,
    Overflow = 12,
}

// Events
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DepositEvent {
    pub total_rewards: i128,
    pub start_time: u64,
    pub end_time: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakeEvent {
    pub staker: Address,
    pub lp_token_in: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PayoutEvent {
    pub staker: Address,
    pub reward: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawEvent {
    pub staker: Address,
    pub lp_token_out: i128,
}

#[contract]
pub struct Amplifier;

#[contractimpl]
impl Amplifier {
    /// Initialize the amplifier. `multiplier_max` is in basis points and
    /// must be at least 10000 (1.0); `reward_lock_duration` is the escrow
    /// lock length applied to delivered rewards and must satisfy the
    /// ledger's duration bounds.
    pub fn initialize(
        env: Env,
        owner: Address,
        lp_token: Address,
        reward_token: Address,
        escrow: Address,
        multiplier_max: i128,
        reward_lock_duration: u64,
    ) -> Result<(), AmplifierError> {
        if env.storage().instance().has(&DataKey::Config) {
            return Err(AmplifierError::AlreadyInitialized);
        }

        owner.require_auth();

        if multiplier_max < MAX_BASIS_POINTS {
            return Err(AmplifierError::InvalidConfiguration);
        }
        if !validate_lock_duration(reward_lock_duration) {
            return Err(AmplifierError::InvalidDuration);
        }

        let config = AmplifierConfig {
            owner: owner.clone(),
            lp_token,
            reward_token,
            escrow,
            multiplier_max,
            reward_lock_duration,
        };
        env.storage().instance().set(&DataKey::Config, &config);

        log!(&env, "amplifier initialized by {}", owner);

        Ok(())
    }

    /// Open the reward epoch. One-shot, owner-only. The reward token
    /// balance equal to `total_rewards` must already be custodied by this
    /// contract.
    pub fn initialize_deposit(
        env: Env,
        caller: Address,
        total_rewards: i128,
        start_time: u64,
        end_time: u64,
    ) -> Result<(), AmplifierError> {
        let config = Self::config(&env)?;

        caller.require_auth();
        if caller != config.owner {
            return Err(AmplifierError::Unauthorized);
        }
        if env.storage().instance().has(&DataKey::Deposit) {
            return Err(AmplifierError::AlreadyInitialized);
        }
        if start_time >= end_time {
            return Err(AmplifierError::InvalidWindow);
        }
        if !validate_positive_amount(total_rewards) {
            return Err(AmplifierError::ZeroAmount);
        }

        let custodied = token::Client::new(&env, &config.reward_token)
            .balance(&env.current_contract_address());
        if custodied < total_rewards {
            return Err(AmplifierError::TransferFailed);
        }

        let deposit = Deposit {
            total_rewards,
            start_time,
            end_time,
            reward_per_second: total_rewards / (end_time - start_time) as i128,
            total_stake: 0,
            total_stakers: 0,
            first_stake_time: 0,
            acc_reward_per_share: 0,
            last_accrual_time: start_time,
            total_claimed_rewards: 0,
            total_reclaimed: 0,
        };
        env.storage().instance().set(&DataKey::Deposit, &deposit);

        env.events().publish(
            (symbol_short!("deposit"),),
            DepositEvent {
                total_rewards,
                start_time,
                end_time,
            },
        );

        log!(
            &env,
            "deposit of {} opened for [{}, {})",
            total_rewards,
            start_time,
            end_time
        );

        Ok(())
    }

    /// Stake `amount` of the stake token into the active epoch. A
    /// pre-existing position is settled first so no accrued reward is lost
    /// to the moved checkpoint.
    pub fn stake(env: Env, staker: Address, amount: i128) -> Result<(), AmplifierError> {
        staker.require_auth();

        let config = Self::config(&env)?;
        let mut deposit = Self::deposit(&env)?;

        if !validate_positive_amount(amount) {
            return Err(AmplifierError::ZeroAmount);
        }

        let now = env.ledger().timestamp();
        if now < deposit.start_time {
            return Err(AmplifierError::NotStarted);
        }
        if now >= deposit.end_time {
            return Err(AmplifierError::EpochOver);
        }

        let lp = token::Client::new(&env, &config.lp_token);
        if lp.balance(&staker) < amount {
            return Err(AmplifierError::TransferFailed);
        }

        // accrue against the pre-stake total
        Self::update_accrual(&mut deposit, now)?;

        let mut position = Self::position(&env, &staker);
        if position.amount > 0 {
            Self::settle(&env, &config, &mut deposit, &staker, &mut position)?;
        } else {
            deposit.total_stakers += 1;
            position.reward_debt = deposit.acc_reward_per_share;
        }

        lp.transfer(&staker, &env.current_contract_address(), &amount);

        position.amount += amount;
        deposit.total_stake += amount;
        if deposit.first_stake_time == 0 {
            deposit.first_stake_time = now;
        }

        env.storage()
            .persistent()
            .set(&DataKey::Staker(staker.clone()), &position);
        env.storage().instance().set(&DataKey::Deposit, &deposit);

        env.events().publish(
            (symbol_short!("stake"), staker.clone()),
            StakeEvent {
                staker: staker.clone(),
                lp_token_in: amount,
            },
        );

        log!(&env, "{} staked {}", staker, amount);

        Ok(())
    }

    /// Claim accrued reward. The multiplier-scaled share is delivered as a
    /// new escrow lock owned by the staker; the shortfall is reclaimed.
    /// Returns the delivered amount.
    pub fn payout(env: Env, staker: Address) -> Result<i128, AmplifierError> {
        staker.require_auth();

        let config = Self::config(&env)?;
        let mut deposit = Self::deposit(&env)?;

        let now = env.ledger().timestamp();
        if now >= deposit.end_time {
            // the epoch is closed; withdraw instead
            return Err(AmplifierError::EpochOver);
        }

        let mut position = Self::position(&env, &staker);
        if position.amount == 0 {
            return Err(AmplifierError::NothingStaked);
        }

        Self::update_accrual(&mut deposit, now)?;
        let delivered = Self::settle(&env, &config, &mut deposit, &staker, &mut position)?;

        env.storage()
            .persistent()
            .set(&DataKey::Staker(staker.clone()), &position);
        env.storage().instance().set(&DataKey::Deposit, &deposit);

        env.events().publish(
            (symbol_short!("payout"), staker.clone()),
            PayoutEvent {
                staker: staker.clone(),
                reward: delivered,
            },
        );

        Ok(delivered)
    }

    /// Settle like `payout`, then return the staked principal minus the
    /// exit fee and close the position. Available in any epoch phase;
    /// the only exit path once the epoch has ended. Returns the stake
    /// token amount paid out.
    pub fn withdraw(env: Env, staker: Address) -> Result<i128, AmplifierError> {
        staker.require_auth();

        let config = Self::config(&env)?;
        let mut deposit = Self::deposit(&env)?;

        let mut position = Self::position(&env, &staker);
        if position.amount == 0 {
            return Err(AmplifierError::NothingStaked);
        }

        let now = env.ledger().timestamp();
        Self::update_accrual(&mut deposit, now)?;
        let delivered = Self::settle(&env, &config, &mut deposit, &staker, &mut position)?;

        env.events().publish(
            (symbol_short!("payout"), staker.clone()),
            PayoutEvent {
                staker: staker.clone(),
                reward: delivered,
            },
        );

        let staked = position.amount;
        let fee = exit_fee(staked);
        let lp_out = staked - fee;

        let lp = token::Client::new(&env, &config.lp_token);
        lp.transfer(&env.current_contract_address(), &staker, &lp_out);
        if fee > 0 {
            lp.transfer(&env.current_contract_address(), &config.owner, &fee);
        }

        position.amount = 0;
        deposit.total_stake -= staked;
        deposit.total_stakers -= 1;

        env.storage()
            .persistent()
            .set(&DataKey::Staker(staker.clone()), &position);
        env.storage().instance().set(&DataKey::Deposit, &deposit);

        env.events().publish(
            (symbol_short!("withdraw"), staker.clone()),
            WithdrawEvent {
                staker: staker.clone(),
                lp_token_out: lp_out,
            },
        );

        log!(&env, "{} withdrew {} (fee {})", staker, lp_out, fee);

        Ok(lp_out)
    }

    // Getters

    pub fn get_config(env: Env) -> Result<AmplifierConfig, AmplifierError> {
        Self::config(&env)
    }

    pub fn get_deposit(env: Env) -> Option<Deposit> {
        env.storage().instance().get(&DataKey::Deposit)
    }

    pub fn lp_token(env: Env) -> Result<Address, AmplifierError> {
        Ok(Self::config(&env)?.lp_token)
    }

    pub fn reward_token(env: Env) -> Result<Address, AmplifierError> {
        Ok(Self::config(&env)?.reward_token)
    }

    pub fn owner(env: Env) -> Result<Address, AmplifierError> {
        Ok(Self::config(&env)?.owner)
    }

    pub fn total_rewards(env: Env) -> i128 {
        Self::get_deposit(env).map(|d| d.total_rewards).unwrap_or(0)
    }

    pub fn start_time(env: Env) -> u64 {
        Self::get_deposit(env).map(|d| d.start_time).unwrap_or(0)
    }

    pub fn end_time(env: Env) -> u64 {
        Self::get_deposit(env).map(|d| d.end_time).unwrap_or(0)
    }

    pub fn total_stake(env: Env) -> i128 {
        Self::get_deposit(env).map(|d| d.total_stake).unwrap_or(0)
    }

    pub fn total_stakers(env: Env) -> u32 {
        Self::get_deposit(env).map(|d| d.total_stakers).unwrap_or(0)
    }

    pub fn first_stake_time(env: Env) -> u64 {
        Self::get_deposit(env)
            .map(|d| d.first_stake_time)
            .unwrap_or(0)
    }

    pub fn total_claimed_rewards(env: Env) -> i128 {
        Self::get_deposit(env)
            .map(|d| d.total_claimed_rewards)
            .unwrap_or(0)
    }

    pub fn total_reclaimed(env: Env) -> i128 {
        Self::get_deposit(env).map(|d| d.total_reclaimed).unwrap_or(0)
    }

    pub fn total_user_stake(env: Env, staker: Address) -> i128 {
        Self::position(&env, &staker).amount
    }

    pub fn user_claimed_rewards(env: Env, staker: Address) -> i128 {
        Self::position(&env, &staker).claimed_rewards
    }

    /// Nominal (pre-multiplier) reward the staker would settle right now
    pub fn pending_reward(env: Env, staker: Address) -> i128 {
        let Some(deposit) = Self::get_deposit(env.clone()) else {
            return 0;
        };
        let position = Self::position(&env, &staker);
        if position.amount == 0 {
            return 0;
        }

        let mut acc = deposit.acc_reward_per_share;
        let effective_now = env.ledger().timestamp().min(deposit.end_time);
        if effective_now > deposit.last_accrual_time && deposit.total_stake > 0 {
            let elapsed = (effective_now - deposit.last_accrual_time) as i128;
            acc += elapsed
                .saturating_mul(deposit.reward_per_second)
                .saturating_mul(SHARE_PRECISION)
                / deposit.total_stake;
        }

        position
            .amount
            .saturating_mul(acc - position.reward_debt)
            / SHARE_PRECISION
    }

    // Internal helpers

    fn config(env: &Env) -> Result<AmplifierConfig, AmplifierError> {
        env.storage()
            .instance()
            .get(&DataKey::Config)
            .ok_or(AmplifierError::NotInitialized)
    }

    fn deposit(env: &Env) -> Result<Deposit, AmplifierError> {
        env.storage()
            .instance()
            .get(&DataKey::Deposit)
            .ok_or(AmplifierError::NotInitialized)
    }

    fn position(env: &Env, staker: &Address) -> StakerPosition {
        env.storage()
            .persistent()
            .get(&DataKey::Staker(staker.clone()))
            .unwrap_or(StakerPosition {
                amount: 0,
                reward_debt: 0,
                claimed_rewards: 0,
            })
    }

    /// Advance the reward-per-share accumulator to `now`, capped at the
    /// epoch end. Accrues in proportion to `1 / total_stake` so each
    /// staker's entitlement since their checkpoint is independent of other
    /// stakers' moves outside the interval.
    fn update_accrual(deposit: &mut Deposit, now: u64) -> Result<(), AmplifierError> {
        let effective_now = now.min(deposit.end_time);
        if effective_now > deposit.last_accrual_time && deposit.total_stake > 0 {
            let elapsed = (effective_now - deposit.last_accrual_time) as i128;
            let accrued = elapsed
                .checked_mul(deposit.reward_per_second)
                .and_then(|v| v.checked_mul(SHARE_PRECISION))
                .ok_or(AmplifierError::Overflow)?;
            deposit.acc_reward_per_share += accrued / deposit.total_stake;
        }
        deposit.last_accrual_time = effective_now;
        Ok(())
    }

    /// Settle the staker's accrued nominal reward: deliver the
    /// multiplier-scaled share as an escrow lock, route the shortfall to
    /// the owner, and move the checkpoint. `delivered + shortfall` equals
    /// the nominal pending amount exactly. Returns `delivered`.
    fn settle(
        env: &Env,
        config: &AmplifierConfig,
        deposit: &mut Deposit,
        staker: &Address,
        position: &mut StakerPosition,
    ) -> Result<i128, AmplifierError> {
        let pending = position
            .amount
            .checked_mul(deposit.acc_reward_per_share - position.reward_debt)
            .ok_or(AmplifierError::Overflow)?
            / SHARE_PRECISION;
        position.reward_debt = deposit.acc_reward_per_share;

        if pending <= 0 {
            return Ok(0);
        }

        // rewards the amplifier itself locked for this staker do not feed
        // back into the boost ratio
        let escrow = VoteEscrowLedgerClient::new(env, &config.escrow);
        let underlying = escrow.get_underlying_tokens(staker) - position.claimed_rewards;
        let lock_ratio = underlying
            .max(0)
            .checked_mul(MAX_BASIS_POINTS)
            .ok_or(AmplifierError::Overflow)?
            .checked_div(deposit.total_rewards)
            .unwrap_or(0)
            .min(MAX_BASIS_POINTS);
        // never drops below 1.0x
        let divisor = (config.multiplier_max - lock_ratio).max(MAX_BASIS_POINTS);

        let delivered = pending
            .checked_mul(MAX_BASIS_POINTS)
            .ok_or(AmplifierError::Overflow)?
            / divisor;
        let shortfall = pending - delivered;

        let reward = token::Client::new(env, &config.reward_token);
        let this = env.current_contract_address();
        if delivered > 0 {
            let expiration = env.ledger().sequence().saturating_add(1);
            reward.approve(&this, &config.escrow, &delivered, &expiration);
            escrow.lock_to(&this, &delivered, &config.reward_lock_duration, staker);
        }
        if shortfall > 0 {
            reward.transfer(&this, &config.owner, &shortfall);
        }

        position.claimed_rewards += delivered;
        deposit.total_claimed_rewards += delivered;
        deposit.total_reclaimed += shortfall;

        log!(
            env,
            "settled {} for {}: delivered {}, reclaimed {}",
            pending,
            staker,
            delivered,
            shortfall
        );

        Ok(delivered)
    }
}
