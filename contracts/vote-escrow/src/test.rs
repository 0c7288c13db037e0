#![cfg(test)]
use super::*;
use boost_shared::{MAX_LOCK_DURATION, MIN_LOCK_DURATION, SECONDS_PER_DAY, SECONDS_PER_WEEK};
use soroban_sdk::{
    testutils::{Address as _, Ledger},
    vec, Env,
};

const ONE: i128 = 1_000_000_000_000_000_000;
const LOCK_AMOUNT: i128 = 10_000 * ONE;
const APPROVE_CAP: i128 = 1_000_000_000 * ONE;

struct EscrowTest {
    env: Env,
    user: Address,
    token: token::Client<'static>,
    token_admin: token::StellarAssetClient<'static>,
    client: VoteEscrowLedgerClient<'static>,
}

fn setup() -> EscrowTest {
    let env = Env::default();
    env.mock_all_auths();
    env.budget().reset_unlimited();
    env.ledger().with_mut(|li| li.timestamp = 1_000_000);

    let user = Address::generate(&env);
    let issuer = Address::generate(&env);
    let token_id = env.register_stellar_asset_contract(issuer);
    let token = token::Client::new(&env, &token_id);
    let token_admin = token::StellarAssetClient::new(&env, &token_id);

    let contract_id = env.register_contract(None, VoteEscrowLedger);
    let client = VoteEscrowLedgerClient::new(&env, &contract_id);
    client.initialize(&token_id);

    token_admin.mint(&user, &LOCK_AMOUNT);
    token.approve(&user, &contract_id, &APPROVE_CAP, &1000);

    EscrowTest {
        env,
        user,
        token,
        token_admin,
        client,
    }
}

#[test]
fn initialize_twice_fails() {
    let t = setup();
    let other = Address::generate(&t.env);
    assert_eq!(
        t.client.try_initialize(&other),
        Err(Ok(EscrowError::AlreadyInitialized))
    );
}

#[test]
fn lock_creates_position_with_fixed_weight() {
    let t = setup();

    let id = t.client.lock(&t.user, &LOCK_AMOUNT, &SECONDS_PER_WEEK);
    assert_eq!(id, 0);

    let expected_weight = LOCK_AMOUNT * SECONDS_PER_WEEK as i128 / MAX_LOCK_DURATION as i128;
    assert_eq!(t.client.balance_of(&t.user), expected_weight);
    assert_eq!(t.client.get_underlying_tokens(&t.user), LOCK_AMOUNT);
    assert_eq!(t.client.total_underlying(), LOCK_AMOUNT);
    assert_eq!(t.client.total_weight(), expected_weight);

    let position = t.client.get_lock(&t.user, &0).unwrap();
    assert_eq!(position.principal, LOCK_AMOUNT);
    assert_eq!(position.duration, SECONDS_PER_WEEK);
    assert_eq!(position.created_at, 1_000_000);
    assert_eq!(position.unlock_at, 1_000_000 + SECONDS_PER_WEEK);
    assert_eq!(position.weight, expected_weight);
    assert!(!position.redeemed);

    // principal moved into ledger custody
    assert_eq!(t.token.balance(&t.user), 0);
    assert_eq!(t.token.balance(&t.client.address), LOCK_AMOUNT);
}

#[test]
fn lock_rejects_out_of_bounds_durations() {
    let t = setup();

    assert_eq!(
        t.client.try_lock(&t.user, &LOCK_AMOUNT, &SECONDS_PER_DAY),
        Err(Ok(EscrowError::InvalidDuration))
    );
    assert_eq!(
        t.client
            .try_lock(&t.user, &LOCK_AMOUNT, &(500 * SECONDS_PER_DAY)),
        Err(Ok(EscrowError::InvalidDuration))
    );
    assert_eq!(t.client.get_underlying_tokens(&t.user), 0);
}

#[test]
fn lock_rejects_zero_and_underfunded_principal() {
    let t = setup();

    assert_eq!(
        t.client.try_lock(&t.user, &0, &SECONDS_PER_WEEK),
        Err(Ok(EscrowError::ZeroAmount))
    );
    assert_eq!(
        t.client
            .try_lock(&t.user, &(LOCK_AMOUNT + 1), &SECONDS_PER_WEEK),
        Err(Ok(EscrowError::InsufficientFunds))
    );
    assert_eq!(t.token.balance(&t.user), LOCK_AMOUNT);
}

#[test]
fn lock_to_credits_beneficiary_not_funder() {
    let t = setup();
    let beneficiary = Address::generate(&t.env);

    t.client
        .lock_to(&t.user, &LOCK_AMOUNT, &MAX_LOCK_DURATION, &beneficiary);

    assert_eq!(t.client.get_underlying_tokens(&beneficiary), LOCK_AMOUNT);
    assert_eq!(t.client.balance_of(&beneficiary), LOCK_AMOUNT);
    assert_eq!(t.client.get_underlying_tokens(&t.user), 0);
    assert_eq!(t.client.get_lock_count(&beneficiary), 1);
    assert_eq!(t.client.get_lock_count(&t.user), 0);
}

#[test]
fn redeem_after_expiry_returns_principal() {
    let t = setup();
    t.client.lock(&t.user, &LOCK_AMOUNT, &SECONDS_PER_WEEK);

    t.env
        .ledger()
        .with_mut(|li| li.timestamp += SECONDS_PER_WEEK);

    let returned = t.client.redeem(&t.user, &vec![&t.env, 0u32]);
    assert_eq!(returned, LOCK_AMOUNT);
    assert_eq!(t.client.balance_of(&t.user), 0);
    assert_eq!(t.client.get_underlying_tokens(&t.user), 0);
    assert_eq!(t.token.balance(&t.user), LOCK_AMOUNT);
    assert_eq!(t.token.balance(&t.client.address), 0);

    // position kept for history, flagged redeemed
    let position = t.client.get_lock(&t.user, &0).unwrap();
    assert!(position.redeemed);
    assert_eq!(t.client.get_lock_count(&t.user), 1);
}

#[test]
fn redeem_too_soon_fails() {
    let t = setup();
    t.client.lock(&t.user, &LOCK_AMOUNT, &SECONDS_PER_WEEK);

    t.env
        .ledger()
        .with_mut(|li| li.timestamp += SECONDS_PER_WEEK - 1);

    assert_eq!(
        t.client.try_redeem(&t.user, &vec![&t.env, 0u32]),
        Err(Ok(EscrowError::LockNotExpired))
    );
    assert_eq!(t.client.get_underlying_tokens(&t.user), LOCK_AMOUNT);
}

#[test]
fn redeem_twice_fails() {
    let t = setup();
    t.client.lock(&t.user, &LOCK_AMOUNT, &SECONDS_PER_WEEK);

    t.env
        .ledger()
        .with_mut(|li| li.timestamp += SECONDS_PER_WEEK);
    t.client.redeem(&t.user, &vec![&t.env, 0u32]);

    assert_eq!(
        t.client.try_redeem(&t.user, &vec![&t.env, 0u32]),
        Err(Ok(EscrowError::AlreadyRedeemed))
    );
}

#[test]
fn redeem_unknown_id_fails() {
    let t = setup();
    assert_eq!(
        t.client.try_redeem(&t.user, &vec![&t.env, 7u32]),
        Err(Ok(EscrowError::LockNotFound))
    );
}

#[test]
fn redeem_batch_is_all_or_nothing() {
    let t = setup();
    t.token_admin.mint(&t.user, &LOCK_AMOUNT);
    t.client.lock(&t.user, &LOCK_AMOUNT, &MIN_LOCK_DURATION);
    t.client
        .lock(&t.user, &LOCK_AMOUNT, &(2 * SECONDS_PER_WEEK));

    // first lock expired, second not: the whole batch must fail untouched
    t.env
        .ledger()
        .with_mut(|li| li.timestamp += SECONDS_PER_WEEK);
    assert_eq!(
        t.client.try_redeem(&t.user, &vec![&t.env, 0u32, 1u32]),
        Err(Ok(EscrowError::LockNotExpired))
    );
    assert_eq!(t.client.get_underlying_tokens(&t.user), 2 * LOCK_AMOUNT);
    assert!(!t.client.get_lock(&t.user, &0).unwrap().redeemed);

    t.env
        .ledger()
        .with_mut(|li| li.timestamp += SECONDS_PER_WEEK);
    let returned = t.client.redeem(&t.user, &vec![&t.env, 0u32, 1u32]);
    assert_eq!(returned, 2 * LOCK_AMOUNT);
    assert_eq!(t.client.get_underlying_tokens(&t.user), 0);
    assert_eq!(t.client.balance_of(&t.user), 0);
}

#[test]
fn aggregates_sum_active_positions() {
    let t = setup();
    t.token_admin.mint(&t.user, &LOCK_AMOUNT);

    t.client.lock(&t.user, &LOCK_AMOUNT, &SECONDS_PER_WEEK);
    t.client.lock(&t.user, &LOCK_AMOUNT, &MAX_LOCK_DURATION);

    let weight_short = LOCK_AMOUNT * SECONDS_PER_WEEK as i128 / MAX_LOCK_DURATION as i128;
    assert_eq!(t.client.get_underlying_tokens(&t.user), 2 * LOCK_AMOUNT);
    assert_eq!(t.client.balance_of(&t.user), weight_short + LOCK_AMOUNT);
    assert_eq!(t.client.get_lock_count(&t.user), 2);

    // redeeming one position only removes that position's contribution
    t.env
        .ledger()
        .with_mut(|li| li.timestamp += SECONDS_PER_WEEK);
    t.client.redeem(&t.user, &vec![&t.env, 0u32]);
    assert_eq!(t.client.get_underlying_tokens(&t.user), LOCK_AMOUNT);
    assert_eq!(t.client.balance_of(&t.user), LOCK_AMOUNT);
}
