use elgamal_custody::{
    ElGamalDecrypter, ElGamalEncrypter, ElGamalEncryptionParameters, ElGamalKeyPairGenerator, GroupElement,
    MultiKeyShareSplitter,
};

use criterion::{criterion_group, criterion_main, Criterion};
use num_bigint::BigInt;
use std::hint::black_box;

const P: &str = "16370518994319586760319791526293535327576438646782139419846004180837103527129035954742043590609421369665944746587885814920851694546456891767644945459124422553763416586515339978014154452159687109161090635367600349264934924141746082060353483306855352192358732451955232000593777554431798981574529854314651092086488426390776811367125009551346089319315111509277347117467107914073639456805159094562593954195960531136052208019343392906816001017488051366518122404819967204601427304267380238263913892658950281593755894747339126531018026798982785331079065126375455293409065540731646939808640273393855256230820509217411510058759";
const Q: &str = "8185259497159793380159895763146767663788219323391069709923002090418551763564517977371021795304710684832972373293942907460425847273228445883822472729562211276881708293257669989007077226079843554580545317683800174632467462070873041030176741653427676096179366225977616000296888777215899490787264927157325546043244213195388405683562504775673044659657555754638673558733553957036819728402579547281296977097980265568026104009671696453408000508744025683259061202409983602300713652133690119131956946329475140796877947373669563265509013399491392665539532563187727646704532770365823469904320136696927628115410254608705755029379";

const SUBKEYS: usize = 4;

pub fn bench_elgamal(c: &mut Criterion) {
    let params = ElGamalEncryptionParameters::from_json(&format!(r#"{{"p":"{P}","q":"{Q}","g":"2"}}"#)).unwrap();
    let pair = ElGamalKeyPairGenerator::new()
        .generate_keys_from_parameters(&params, SUBKEYS)
        .unwrap();
    let group = pair.public_key.group().clone();
    let messages: Vec<GroupElement> = (0..SUBKEYS)
        .map(|i| {
            let base = BigInt::from(5 + i as u64);
            group.element(&base * &base).unwrap()
        })
        .collect();

    let encrypter = ElGamalEncrypter::new(pair.public_key.clone());
    let decrypter = ElGamalDecrypter::new(pair.private_key.clone());
    let values = encrypter.encrypt_group_elements(&messages).unwrap();

    c.bench_function("encrypt 4 elements, 2048-bit p", |b| {
        b.iter(|| encrypter.encrypt_group_elements(black_box(&messages)).unwrap())
    });
    c.bench_function("encrypt 4 elements, short exponent", |b| {
        b.iter(|| {
            encrypter
                .encrypt_group_elements_with_short_exponent(black_box(&messages))
                .unwrap()
        })
    });
    c.bench_function("pre-compute 4 phis", |b| b.iter(|| encrypter.pre_compute().unwrap()));
    c.bench_function("decrypt 4 elements with membership check", |b| {
        b.iter(|| decrypter.decrypt(black_box(values.ciphertext()), true).unwrap())
    });
    c.bench_function("split 4 sub-keys 5/3", |b| {
        b.iter(|| MultiKeyShareSplitter::default().split(black_box(&pair.private_key), 5, 3).unwrap())
    });
}

criterion_group!(benches, bench_elgamal);
criterion_main!(benches);
